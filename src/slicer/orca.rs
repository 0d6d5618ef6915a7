//! Support for the Orca Slicer CLI.

use std::path::PathBuf;

use tokio::process::Command;

use super::{tail, Artifacts, EngineError, SliceOutcome, OUTPUT_TAIL_CHARS};
use crate::workspace::Workspace;

/// Handle to invoke the Orca Slicer binary against a prepared workspace.
pub struct Slicer {
    binary: Option<PathBuf>,
}

impl Slicer {
    /// Create a new [Slicer]. When `binary` is `None` the executable is
    /// discovered at the platform's conventional install location.
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    /// Slice the workspace's model with its generated documents, capturing
    /// the run rather than interpreting it: exit code, output tails, and
    /// artifact existence all go into the outcome for the caller to judge.
    pub async fn slice(&self, workspace: &Workspace) -> Result<SliceOutcome, EngineError> {
        let binary = match &self.binary {
            Some(path) if path.exists() => path.clone(),
            Some(path) => {
                return Err(EngineError::NotFound(format!(
                    "configured slicer binary {} does not exist",
                    path.display()
                )))
            }
            None => find_orca_slicer().ok_or_else(|| {
                EngineError::NotFound("orca-slicer not found at its conventional path".to_string())
            })?,
        };

        let archive = workspace.dir.join("output.3mf");
        let slice_data = workspace.dir.join("slicedata");
        let merged_settings = workspace.dir.join("merged_settings.json");

        let settings = format!(
            "{};{}",
            workspace.process_path.display(),
            workspace.machine_path.display()
        );

        let args: Vec<String> = vec![
            "--load-settings".to_string(),
            settings,
            "--load-filaments".to_string(),
            workspace.filament_path.display().to_string(),
            "--slice".to_string(),
            "0".to_string(),
            "--orient".to_string(),
            "1".to_string(),
            "--export-3mf".to_string(),
            archive.display().to_string(),
            "--export-slicedata".to_string(),
            slice_data.display().to_string(),
            "--export-settings".to_string(),
            merged_settings.display().to_string(),
            workspace.model.display().to_string(),
        ];
        let command = format!("{} {}", binary.display(), args.join(" "));
        tracing::debug!(command = command, "invoking slicing engine");

        let output = Command::new(&binary).args(&args).output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        Ok(SliceOutcome {
            command,
            exit_code: output.status.code(),
            stdout_tail: tail(&stdout, OUTPUT_TAIL_CHARS),
            stderr_tail: tail(&stderr, OUTPUT_TAIL_CHARS),
            artifacts: Artifacts {
                archive: archive.is_file(),
                slice_data: slice_data.is_dir(),
                merged_settings: merged_settings.is_file(),
            },
        })
    }
}

// Find the orcaslicer executable path on macOS.
#[cfg(target_os = "macos")]
fn find_orca_slicer() -> Option<PathBuf> {
    let app_path = PathBuf::from("/Applications/OrcaSlicer.app/Contents/MacOS/OrcaSlicer");
    app_path.exists().then_some(app_path)
}

// Find the orcaslicer executable path on Windows.
#[cfg(target_os = "windows")]
fn find_orca_slicer() -> Option<PathBuf> {
    let app_path = PathBuf::from("C:\\Program Files\\OrcaSlicer\\orca-slicer.exe");
    app_path.exists().then_some(app_path)
}

// Find the orcaslicer executable path on Linux.
#[cfg(target_os = "linux")]
fn find_orca_slicer() -> Option<PathBuf> {
    let app_path = PathBuf::from("/usr/bin/orca-slicer");
    app_path.exists().then_some(app_path)
}
