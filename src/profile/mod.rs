//! The three configuration documents consumed by the slicing engine.
//!
//! Each profile exists in two forms: a permissive `Raw*` struct that accepts
//! whatever shapes presets ship with (scalars for lists, numbers as strings,
//! unknown fields), and an engine-ready `*Doc` struct with canonical types.
//! `normalize()` converts the former into the latter; it never fails, it only
//! defaults. Unknown fields ride along untouched in a flattened map.

mod filament;
mod machine;
mod process;

pub use filament::{FilamentDoc, RawFilament};
pub use machine::{MachineDoc, RawMachine, MAX_LAYER_HEIGHT, MIN_LAYER_HEIGHT};
pub use process::{ProcessDoc, RawProcess};

use serde::{Deserialize, Serialize};

/// Origin tag stamped on generated documents.
pub(crate) const DOC_FROM: &str = "user";

/// The machine attributes the engine's compatibility matcher keys on.
///
/// Owned by the machine document; process and filament documents carry a
/// by-value snapshot taken after the machine's final mutation. The copies are
/// never kept in sync afterwards.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MachineSignature {
    /// Print technology, e.g. `"FFF"`.
    pub printer_technology: String,
    /// Printer model identifier.
    pub printer_model: String,
    /// Model variant, conventionally the nozzle size.
    pub printer_variant: String,
    /// Gcode dialect the machine speaks.
    pub gcode_flavor: String,
    /// Number of extruders.
    pub extruders: i64,
    /// Nozzle bore diameters in millimeters, one per extruder slot.
    pub nozzle_diameter: Vec<f64>,
}

impl MachineSignature {
    /// The JSON keys this signature occupies. Raw process/filament profiles
    /// sometimes carry stale copies of these; they are stripped during
    /// normalization so the machine's snapshot is the only one emitted.
    pub(crate) const FIELDS: [&'static str; 6] = [
        "printer_technology",
        "printer_model",
        "printer_variant",
        "gcode_flavor",
        "extruders",
        "nozzle_diameter",
    ];
}
