//! The process (slicing parameters) document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MachineSignature, DOC_FROM};
use crate::coerce::{canonical_string, coerce_float, string_list};

/// Layer-gcode fields that must not reset the extruder axis; the engine is
/// driven with absolute E distances.
const LAYER_GCODE_FIELDS: [&str; 4] = [
    "before_layer_gcode",
    "layer_gcode",
    "before_layer_change_gcode",
    "layer_change_gcode",
];

/// Fields some presets ship with `-1` placeholders the engine rejects.
const NEGATIVE_PLACEHOLDER_FIELDS: [&str; 2] =
    ["tree_support_wall_count", "raft_first_layer_expansion"];

/// A process profile as found on disk.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawProcess {
    /// Document kind tag, when present.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Document origin tag, when present.
    pub from: Option<String>,
    /// Preset display name.
    pub name: Option<String>,
    /// Layer height; number or numeric string.
    pub layer_height: Option<Value>,
    /// First-layer height; number or numeric string.
    pub first_layer_height: Option<Value>,
    /// Sparse infill density as a percent number or percent string.
    pub sparse_infill_density: Option<Value>,
    /// Printer names this process is valid for; scalar or list.
    pub compatible_printers: Option<Value>,
    /// Conditional-compatibility expression; always discarded.
    pub compatible_printers_condition: Option<Value>,
    /// Everything else passes through (after hardening).
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// An engine-ready process document.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessDoc {
    /// Document kind, `"process"` unless the profile said otherwise.
    #[serde(rename = "type")]
    pub kind: String,
    /// Document origin.
    pub from: String,
    /// Preset display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Layer height in millimeters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_height: Option<f64>,
    /// First-layer height in millimeters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_layer_height: Option<f64>,
    /// Sparse infill density as an integer percent string, e.g. `"20%"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparse_infill_density: Option<String>,
    /// Printer names this process is valid for.
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

impl RawProcess {
    /// Fill defaults, coerce field shapes, harden gcode/placeholder fields,
    /// and tag metadata.
    pub fn normalize(self) -> ProcessDoc {
        let mut rest = self.rest;
        // Stale identity copies are dropped; the machine document is the only
        // source for these keys.
        for key in MachineSignature::FIELDS {
            rest.remove(key);
        }
        harden(&mut rest);

        ProcessDoc {
            kind: self.kind.unwrap_or_else(|| "process".to_string()),
            from: self.from.unwrap_or_else(|| DOC_FROM.to_string()),
            name: self.name,
            layer_height: self.layer_height.as_ref().and_then(coerce_float),
            first_layer_height: self.first_layer_height.as_ref().and_then(coerce_float),
            sparse_infill_density: self
                .sparse_infill_density
                .as_ref()
                .and_then(coerce_float)
                .map(|pct| format!("{}%", pct.round() as i64)),
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

/// Neutralize field values known to upset the engine.
fn harden(rest: &mut Map<String, Value>) {
    // E distances stay absolute; stringify the flag either way.
    let relative_e = rest
        .get("use_relative_e_distances")
        .map(canonical_string)
        .unwrap_or_else(|| "0".to_string());
    rest.insert(
        "use_relative_e_distances".to_string(),
        Value::String(relative_e),
    );

    // An absolute-E run must not carry E-axis resets in layer gcode.
    for key in LAYER_GCODE_FIELDS {
        if let Some(Value::String(gcode)) = rest.get_mut(key) {
            *gcode = gcode.replace("G92 E0", "").trim().to_string();
        }
    }

    for key in NEGATIVE_PLACEHOLDER_FIELDS {
        if let Some(v) = rest.get(key) {
            let negative_or_junk = coerce_float(v).map(|f| f < 0.0).unwrap_or(true);
            if negative_or_junk {
                rest.insert(key.to_string(), Value::String("0".to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(v: Value) -> RawProcess {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_infill_density_percent_string() {
        let process = raw(json!({ "sparse_infill_density": 20 })).normalize();
        assert_eq!(process.sparse_infill_density.as_deref(), Some("20%"));

        let process = raw(json!({ "sparse_infill_density": "15.4%" })).normalize();
        assert_eq!(process.sparse_infill_density.as_deref(), Some("15%"));

        let process = raw(json!({ "sparse_infill_density": "junk" })).normalize();
        assert_eq!(process.sparse_infill_density, None);
    }

    #[test]
    fn test_layer_heights_coerced() {
        let process = raw(json!({
            "layer_height": "0.2",
            "first_layer_height": 0.25,
        }))
        .normalize();
        assert_eq!(process.layer_height, Some(0.2));
        assert_eq!(process.first_layer_height, Some(0.25));
    }

    #[test]
    fn test_compat_fields_reset() {
        let process = raw(json!({
            "compatible_printers": "Old Printer",
            "compatible_printers_condition": "printer_model == \"X1C\"",
        }))
        .normalize();
        assert_eq!(process.compatible_printers, vec!["Old Printer"]);
        assert_eq!(process.compatible_printers_condition, "");
    }

    #[test]
    fn test_gcode_scrub_and_relative_e() {
        let process = raw(json!({
            "layer_gcode": "G92 E0\nM117 layer",
            "use_relative_e_distances": true,
        }))
        .normalize();
        assert_eq!(process.rest["layer_gcode"], json!("M117 layer"));
        assert_eq!(process.rest["use_relative_e_distances"], json!("1"));

        let process = raw(json!({})).normalize();
        assert_eq!(process.rest["use_relative_e_distances"], json!("0"));
    }

    #[test]
    fn test_negative_placeholders_neutralized() {
        let process = raw(json!({
            "tree_support_wall_count": -1,
            "raft_first_layer_expansion": "2.0",
        }))
        .normalize();
        assert_eq!(process.rest["tree_support_wall_count"], json!("0"));
        assert_eq!(process.rest["raft_first_layer_expansion"], json!("2.0"));
    }

    #[test]
    fn test_stale_identity_dropped() {
        let process = raw(json!({
            "printer_model": "Stale Model",
            "nozzle_diameter": [0.6],
            "layer_height": 0.2,
        }))
        .normalize();
        let out = serde_json::to_value(&process).unwrap();
        assert_eq!(out.get("printer_model"), None);
        assert_eq!(out.get("nozzle_diameter"), None);
    }
}
