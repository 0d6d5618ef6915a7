//! The machine (printer) document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{MachineSignature, DOC_FROM};
use crate::coerce::{as_list, coerce_float, coerce_int};

/// Floor of the layer height window. Profile-supplied bounds are discarded.
pub const MIN_LAYER_HEIGHT: f64 = 0.15;
/// Ceiling of the layer height window.
pub const MAX_LAYER_HEIGHT: f64 = 0.30;

const DEFAULT_TECHNOLOGY: &str = "FFF";
const DEFAULT_GCODE_FLAVOR: &str = "marlin";
const DEFAULT_NOZZLE_DIAMETER: f64 = 0.4;
const DEFAULT_MAX_PRINT_HEIGHT: f64 = 300.0;
const DEFAULT_PRINTER_MODEL: &str = "Generic FFF Printer";
const DEFAULT_PRINTER_VARIANT: &str = "0.4";

/// A machine profile as found on disk. Field shapes are whatever the preset
/// exporter felt like: lists may be scalars, numbers may be strings, the bed
/// outline may be `"AxB"` strings or coordinate pairs.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawMachine {
    /// Document kind tag, when present.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Document origin tag, when present.
    pub from: Option<String>,
    /// Preset display name.
    pub name: Option<String>,
    /// Print technology.
    pub printer_technology: Option<String>,
    /// Gcode dialect.
    pub gcode_flavor: Option<String>,
    /// Printer model identifier.
    pub printer_model: Option<String>,
    /// Model variant.
    pub printer_variant: Option<String>,
    /// Extruder count; number or numeric string.
    pub extruders: Option<Value>,
    /// Nozzle bore(s); scalar or list, numeric or string entries.
    pub nozzle_diameter: Option<Value>,
    /// Bed outline; list of `"AxB"` strings or `[x, y]` pairs.
    pub bed_shape: Option<Value>,
    /// Alternate spelling of the bed outline used by some preset exports.
    pub printable_area: Option<Value>,
    /// Build height in millimeters.
    pub max_print_height: Option<Value>,
    /// Profile-supplied layer floor; discarded during normalization.
    pub min_layer_height: Option<Value>,
    /// Profile-supplied layer ceiling; discarded during normalization.
    pub max_layer_height: Option<Value>,
    /// Everything else passes through untouched.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// An engine-ready machine document.
#[derive(Clone, Debug, Serialize)]
pub struct MachineDoc {
    /// Document kind, `"machine"` unless the profile said otherwise.
    #[serde(rename = "type")]
    pub kind: String,
    /// Document origin.
    pub from: String,
    /// Preset display name; the workspace builder decides this last.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Print technology.
    pub printer_technology: String,
    /// Gcode dialect.
    pub gcode_flavor: String,
    /// Printer model identifier.
    pub printer_model: String,
    /// Model variant.
    pub printer_variant: String,
    /// Extruder count.
    pub extruders: i64,
    /// Nozzle bores in millimeters. Never empty.
    pub nozzle_diameter: Vec<f64>,
    /// Bed outline as `[x, y]` pairs, never raw strings.
    pub bed_shape: Vec<[f64; 2]>,
    /// Build height in millimeters.
    pub max_print_height: f64,
    /// Layer height floor the process document is clamped into.
    pub min_layer_height: f64,
    /// Layer height ceiling the process document is clamped into.
    pub max_layer_height: f64,
    /// Pass-through fields.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl RawMachine {
    /// Fill defaults, coerce field shapes, and tag metadata, producing a
    /// document the engine will accept.
    pub fn normalize(self) -> MachineDoc {
        let bed_shape = self
            .bed_shape
            .or(self.printable_area)
            .map(|v| parse_bed_shape(&v))
            .unwrap_or_default();

        let mut nozzle_diameter: Vec<f64> = self
            .nozzle_diameter
            .map(|v| as_list(&v).iter().filter_map(coerce_float).collect())
            .unwrap_or_default();
        if nozzle_diameter.is_empty() {
            nozzle_diameter.push(DEFAULT_NOZZLE_DIAMETER);
        }

        MachineDoc {
            kind: self.kind.unwrap_or_else(|| "machine".to_string()),
            from: self.from.unwrap_or_else(|| DOC_FROM.to_string()),
            name: self.name.filter(|s| !s.is_empty()),
            printer_technology: self
                .printer_technology
                .unwrap_or_else(|| DEFAULT_TECHNOLOGY.to_string()),
            gcode_flavor: self
                .gcode_flavor
                .unwrap_or_else(|| DEFAULT_GCODE_FLAVOR.to_string()),
            printer_model: self
                .printer_model
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_PRINTER_MODEL.to_string()),
            printer_variant: self
                .printer_variant
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_PRINTER_VARIANT.to_string()),
            extruders: self.extruders.as_ref().and_then(coerce_int).unwrap_or(1),
            nozzle_diameter,
            bed_shape,
            max_print_height: self
                .max_print_height
                .as_ref()
                .and_then(coerce_float)
                .unwrap_or(DEFAULT_MAX_PRINT_HEIGHT),
            min_layer_height: MIN_LAYER_HEIGHT,
            max_layer_height: MAX_LAYER_HEIGHT,
            rest: self.rest,
        }
    }
}

impl MachineDoc {
    /// Snapshot of the attributes the engine matches process and filament
    /// documents against.
    pub fn signature(&self) -> MachineSignature {
        MachineSignature {
            printer_technology: self.printer_technology.clone(),
            printer_model: self.printer_model.clone(),
            printer_variant: self.printer_variant.clone(),
            gcode_flavor: self.gcode_flavor.clone(),
            extruders: self.extruders,
            nozzle_diameter: self.nozzle_diameter.clone(),
        }
    }
}

fn parse_bed_shape(v: &Value) -> Vec<[f64; 2]> {
    as_list(v).iter().filter_map(parse_bed_point).collect()
}

fn parse_bed_point(v: &Value) -> Option<[f64; 2]> {
    match v {
        Value::String(s) => {
            let (x, y) = s.split_once('x')?;
            Some([x.trim().parse().ok()?, y.trim().parse().ok()?])
        }
        Value::Array(pair) if pair.len() == 2 => {
            Some([coerce_float(&pair[0])?, coerce_float(&pair[1])?])
        }
        _ => None,
    }
}
