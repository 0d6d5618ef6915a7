//! Engine backends that consume a prepared [crate::workspace::Workspace]
//! and report what the run produced.

pub mod noop;
pub mod orca;

use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::workspace::Workspace;

/// How much of the engine's captured output is kept in reports.
const OUTPUT_TAIL_CHARS: usize = 1400;

/// Which engine to run, as selected by the app config.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Config {
    /// Invoke the Orca Slicer CLI.
    Orca {
        /// Explicit binary path; discovered per-platform when unset.
        binary: Option<PathBuf>,
    },
    /// Pretend to slice. For tests and dry runs.
    Noop,
}

impl Default for Config {
    fn default() -> Self {
        Self::Orca { binary: None }
    }
}

impl Config {
    /// Construct the configured engine handle.
    pub fn load(&self) -> AnySlicer {
        match self {
            Self::Orca { binary } => orca::Slicer::new(binary.clone()).into(),
            Self::Noop => noop::Slicer::new().into(),
        }
    }
}

/// Any supported engine.
pub enum AnySlicer {
    /// The Orca Slicer CLI.
    Orca(orca::Slicer),
    /// The no-op engine.
    Noop(noop::Slicer),
}

impl From<orca::Slicer> for AnySlicer {
    fn from(slicer: orca::Slicer) -> Self {
        Self::Orca(slicer)
    }
}

impl From<noop::Slicer> for AnySlicer {
    fn from(slicer: noop::Slicer) -> Self {
        Self::Noop(slicer)
    }
}

impl AnySlicer {
    /// Run the engine against `workspace`.
    pub async fn slice(&self, workspace: &Workspace) -> Result<SliceOutcome, EngineError> {
        match self {
            Self::Orca(slicer) => slicer.slice(workspace).await,
            Self::Noop(slicer) => slicer.slice(workspace).await,
        }
    }
}

/// Failure to run the engine at all, as opposed to the engine running and
/// failing — the latter is a [SliceOutcome].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No usable engine binary.
    #[error("slicing engine not found: {0}")]
    NotFound(String),
    /// Spawning or waiting on the subprocess failed.
    #[error("failed to run slicing engine: {0}")]
    Io(#[from] std::io::Error),
}

/// What an engine run produced.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SliceOutcome {
    /// The command line the engine was invoked with.
    pub command: String,
    /// Process exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Tail of captured standard output.
    pub stdout_tail: String,
    /// Tail of captured standard error.
    pub stderr_tail: String,
    /// Which of the expected output artifacts exist.
    pub artifacts: Artifacts,
}

/// Existence flags for the engine's expected outputs.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema)]
pub struct Artifacts {
    /// The exported archive (`.3mf`).
    pub archive: bool,
    /// The slice-data directory.
    pub slice_data: bool,
    /// The merged-settings dump.
    pub merged_settings: bool,
}

impl SliceOutcome {
    /// A run counts as a success iff the engine exited zero and produced the
    /// output archive.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && self.artifacts.archive
    }
}

/// Last `max` characters of captured output.
pub(crate) fn tail(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tail() {
        assert_eq!(tail("short", 1400), "short");
        let long = "x".repeat(2000);
        assert_eq!(tail(&long, 1400).len(), 1400);
        // Never slices through a multi-byte character.
        let umlauts = "ü".repeat(800);
        assert_eq!(tail(&umlauts, 5), "üü");
    }

    #[test]
    fn test_success_requires_archive() {
        let outcome = SliceOutcome {
            command: "orca-slicer".to_string(),
            exit_code: Some(0),
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            artifacts: Artifacts {
                archive: false,
                slice_data: true,
                merged_settings: true,
            },
        };
        assert!(!outcome.success());

        let ok = SliceOutcome {
            artifacts: Artifacts {
                archive: true,
                ..outcome.artifacts
            },
            ..outcome
        };
        assert!(ok.success());

        let crashed = SliceOutcome {
            exit_code: None,
            ..ok
        };
        assert!(!crashed.success());
    }

    #[test]
    fn test_config_default_is_orca() {
        assert!(matches!(Config::default(), Config::Orca { binary: None }));
        let parsed: Config = serde_json::from_value(serde_json::json!({ "type": "Noop" })).unwrap();
        assert!(matches!(parsed, Config::Noop));
    }
}
