//! A stand-in engine that won't slice anything at all.
//!
//! It touches the expected archive and reports a clean exit, which makes the
//! full request path exercisable in tests and dry runs without an engine
//! install.

use super::{Artifacts, EngineError, SliceOutcome};
use crate::workspace::Workspace;

/// The no-op engine.
#[derive(Clone, Copy, Debug)]
pub struct Slicer {}

impl Slicer {
    /// Create a new no-op engine. It won't do anything.
    pub fn new() -> Self {
        Self {}
    }

    /// "Run" the engine: write an empty archive and report success.
    pub async fn slice(&self, workspace: &Workspace) -> Result<SliceOutcome, EngineError> {
        let archive = workspace.dir.join("output.3mf");
        tokio::fs::write(&archive, b"").await?;
        Ok(SliceOutcome {
            command: "noop".to_string(),
            exit_code: Some(0),
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            artifacts: Artifacts {
                archive: archive.is_file(),
                slice_data: false,
                merged_settings: false,
            },
        })
    }
}

impl Default for Slicer {
    fn default() -> Self {
        Self::new()
    }
}
