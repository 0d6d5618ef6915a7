//! The structured outcome returned for every slice request.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    slicer::SliceOutcome,
    workspace::{SliceParameters, Workspace},
};

/// Everything a caller needs to judge a slice run without access to server
/// logs: the engine outcome, the inputs that produced it, and a preview of
/// the generated documents.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SliceReport {
    /// Whether the engine exited zero and produced the output archive.
    pub success: bool,
    /// The engine run: command line, exit code, output tails, artifacts.
    pub engine: SliceOutcome,
    /// Which source profiles fed the request.
    pub profiles: ProfileSources,
    /// The request as parsed.
    pub request: RequestSummary,
    /// Key fields of the three generated documents.
    pub preview: DocumentPreview,
    /// When the request finished.
    pub completed_at: DateTime<Utc>,
}

/// Which source profiles fed the request.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ProfileSources {
    /// Source machine profile path.
    pub machine: String,
    /// Source process profile path.
    pub process: String,
    /// Source filament profile path.
    pub filament: String,
    /// Printer display name registered in the generated documents.
    pub printer_name: String,
}

/// The request as parsed.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct RequestSummary {
    /// Name of the uploaded model file.
    pub file_name: String,
    /// The parameters used for this slice.
    pub parameters: SliceParameters,
}

/// Key fields of the three generated documents.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct DocumentPreview {
    /// Machine document snapshot.
    pub machine: MachinePreview,
    /// Process document snapshot.
    pub process: ProcessPreview,
    /// Filament document snapshot.
    pub filament: FilamentPreview,
}

/// Machine document snapshot.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct MachinePreview {
    /// Printer display name.
    pub name: Option<String>,
    /// Printer model identifier.
    pub printer_model: String,
    /// Model variant.
    pub printer_variant: String,
    /// Nozzle bores in millimeters.
    pub nozzle_diameter: Vec<f64>,
    /// Build height in millimeters.
    pub max_print_height: f64,
}

/// Process document snapshot.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ProcessPreview {
    /// Layer height after clamping.
    pub layer_height: Option<f64>,
    /// Sparse infill density percent string.
    pub sparse_infill_density: Option<String>,
    /// Printers the document is registered as compatible with.
    pub compatible_printers: Vec<String>,
}

/// Filament document snapshot.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct FilamentPreview {
    /// Nozzle temperature list.
    pub nozzle_temperature: Option<Vec<String>>,
    /// Filament diameter list.
    pub filament_diameter: Option<Vec<String>>,
    /// Printers the document is registered as compatible with.
    pub compatible_printers: Vec<String>,
}

impl SliceReport {
    /// Assemble the report for a finished engine run.
    pub fn new(
        workspace: &Workspace,
        engine: SliceOutcome,
        file_name: &str,
        parameters: &SliceParameters,
    ) -> Self {
        let printer_name = workspace.machine.name.clone().unwrap_or_default();
        SliceReport {
            success: engine.success(),
            engine,
            profiles: ProfileSources {
                machine: workspace.sources.machine.display().to_string(),
                process: workspace.sources.process.display().to_string(),
                filament: workspace.sources.filament.display().to_string(),
                printer_name,
            },
            request: RequestSummary {
                file_name: file_name.to_string(),
                parameters: parameters.clone(),
            },
            preview: DocumentPreview {
                machine: MachinePreview {
                    name: workspace.machine.name.clone(),
                    printer_model: workspace.machine.printer_model.clone(),
                    printer_variant: workspace.machine.printer_variant.clone(),
                    nozzle_diameter: workspace.machine.nozzle_diameter.clone(),
                    max_print_height: workspace.machine.max_print_height,
                },
                process: ProcessPreview {
                    layer_height: workspace.process.layer_height,
                    sparse_infill_density: workspace.process.sparse_infill_density.clone(),
                    compatible_printers: workspace.process.compatible_printers.clone(),
                },
                filament: FilamentPreview {
                    nozzle_temperature: workspace.filament.nozzle_temperature.clone(),
                    filament_diameter: workspace.filament.filament_diameter.clone(),
                    compatible_printers: workspace.filament.compatible_printers.clone(),
                },
            },
            completed_at: Utc::now(),
        }
    }
}
