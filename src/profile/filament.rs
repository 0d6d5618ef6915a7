//! The filament (material) document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MachineSignature, DOC_FROM};
use crate::coerce::string_list;

/// A filament profile as found on disk.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawFilament {
    /// Document kind tag, when present.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Document origin tag, when present.
    pub from: Option<String>,
    /// Preset display name.
    pub name: Option<String>,
    /// Extrusion flow multiplier(s); scalar or list.
    pub filament_flow_ratio: Option<Value>,
    /// Nozzle temperature(s) in °C; scalar or list.
    pub nozzle_temperature: Option<Value>,
    /// First-layer nozzle temperature(s) in °C.
    pub nozzle_temperature_initial_layer: Option<Value>,
    /// Bed temperature(s) in °C.
    pub hot_plate_temp: Option<Value>,
    /// First-layer bed temperature(s) in °C.
    pub hot_plate_temp_initial_layer: Option<Value>,
    /// Filament diameter(s) in millimeters.
    pub filament_diameter: Option<Value>,
    /// Material density / densities in g/cm³.
    pub filament_density: Option<Value>,
    /// Printer names this filament is valid for; scalar or list.
    pub compatible_printers: Option<Value>,
    /// Conditional-compatibility expression; always discarded.
    pub compatible_printers_condition: Option<Value>,
    /// Everything else passes through untouched.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// An engine-ready filament document. The per-extruder numeric fields are
/// lists of canonical strings, one entry per extruder slot, which is the
/// shape preset exports use.
#[derive(Clone, Debug, Serialize)]
pub struct FilamentDoc {
    /// Document kind, `"filament"` unless the profile said otherwise.
    #[serde(rename = "type")]
    pub kind: String,
    /// Document origin.
    pub from: String,
    /// Preset display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Extrusion flow multiplier(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filament_flow_ratio: Option<Vec<String>>,
    /// Nozzle temperature(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nozzle_temperature: Option<Vec<String>>,
    /// First-layer nozzle temperature(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nozzle_temperature_initial_layer: Option<Vec<String>>,
    /// Bed temperature(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_plate_temp: Option<Vec<String>>,
    /// First-layer bed temperature(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hot_plate_temp_initial_layer: Option<Vec<String>>,
    /// Filament diameter(s).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filament_diameter: Option<Vec<String>>,
    /// Material density / densities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filament_density: Option<Vec<String>>,
    /// Printer names this filament is valid for.
    pub compatible_printers: Vec<String>,
    /// Conditional-compatibility expression; this system never authors one.
    pub compatible_printers_condition: String,
    /// Identity snapshot copied from the machine document.
    #[serde(flatten)]
    pub signature: Option<MachineSignature>,
    /// Pass-through fields.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RawFilament {
    /// Fill defaults, render the per-extruder fields as canonical string
    /// lists, and tag metadata.
    pub fn normalize(self) -> FilamentDoc {
        let mut rest = self.rest;
        for key in MachineSignature::FIELDS {
            rest.remove(key);
        }

        let render = |v: Option<Value>| v.map(|v| string_list(&v));

        FilamentDoc {
            kind: self.kind.unwrap_or_else(|| "filament".to_string()),
            from: self.from.unwrap_or_else(|| DOC_FROM.to_string()),
            name: self.name,
            filament_flow_ratio: render(self.filament_flow_ratio),
            nozzle_temperature: render(self.nozzle_temperature),
            nozzle_temperature_initial_layer: render(self.nozzle_temperature_initial_layer),
            hot_plate_temp: render(self.hot_plate_temp),
            hot_plate_temp_initial_layer: render(self.hot_plate_temp_initial_layer),
            filament_diameter: render(self.filament_diameter),
            filament_density: render(self.filament_density),
            compatible_printers: self
                .compatible_printers
                .map(|v| string_list(&v))
                .unwrap_or_default(),
            compatible_printers_condition: String::new(),
            signature: None,
            rest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(v: Value) -> RawFilament {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_numeric_fields_become_string_lists() {
        let filament = raw(json!({
            "nozzle_temperature": [220],
            "hot_plate_temp": 60,
            "filament_flow_ratio": 0.98,
            "filament_diameter": ["1.75"],
            "filament_density": 1.24,
        }))
        .normalize();
        assert_eq!(filament.nozzle_temperature, Some(vec!["220".to_string()]));
        assert_eq!(filament.hot_plate_temp, Some(vec!["60".to_string()]));
        assert_eq!(filament.filament_flow_ratio, Some(vec!["0.98".to_string()]));
        assert_eq!(filament.filament_diameter, Some(vec!["1.75".to_string()]));
        assert_eq!(filament.filament_density, Some(vec!["1.24".to_string()]));
    }

    #[test]
    fn test_integer_valued_floats_drop_the_point() {
        let filament = raw(json!({ "nozzle_temperature": [220.0, 235.5] })).normalize();
        assert_eq!(
            filament.nozzle_temperature,
            Some(vec!["220".to_string(), "235.5".to_string()])
        );
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let filament = raw(json!({})).normalize();
        assert_eq!(filament.nozzle_temperature, None);
        let out = serde_json::to_value(&filament).unwrap();
        assert_eq!(out.get("nozzle_temperature"), None);
        assert_eq!(out["type"], json!("filament"));
    }

    #[test]
    fn test_compat_fields_reset() {
        let filament = raw(json!({
            "compatible_printers": ["A", "B"],
            "compatible_printers_condition": "nozzle_diameter[0]==0.4",
        }))
        .normalize();
        assert_eq!(filament.compatible_printers, vec!["A", "B"]);
        assert_eq!(filament.compatible_printers_condition, "");
    }

    #[test]
    fn test_stale_identity_dropped() {
        let filament = raw(json!({ "extruders": 4, "gcode_flavor": "klipper" })).normalize();
        let out = serde_json::to_value(&filament).unwrap();
        assert_eq!(out.get("extruders"), None);
        assert_eq!(out.get("gcode_flavor"), None);
    }
}
