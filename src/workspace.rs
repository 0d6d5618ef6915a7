//! Per-request execution workspaces.
//!
//! A workspace is a temporary directory holding the uploaded model and the
//! three generated configuration documents, ready for the engine. It is
//! removed when dropped unless explicitly persisted.

use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    compat,
    profile::{FilamentDoc, MachineDoc, ProcessDoc, RawFilament, RawMachine, RawProcess},
    resolver::{self, ResolvedProfiles},
};

/// Units an uploaded model may be expressed in.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    parse_display::Display,
    parse_display::FromStr,
    Deserialize,
    Serialize,
    JsonSchema,
)]
#[display(style = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Millimeters.
    #[default]
    Mm,
    /// Inches.
    Inch,
}

/// Print parameters accepted alongside the uploaded model.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct SliceParameters {
    /// Material label, e.g. `"PLA"`. Informational; the filament profile is
    /// chosen by the profile store.
    pub material: String,
    /// Sparse infill fraction, `0.0..=1.0`.
    pub infill: f64,
    /// Requested layer height in millimeters.
    pub layer_height: f64,
    /// Requested nozzle bore in millimeters.
    pub nozzle_diameter: f64,
    /// Units the model is expressed in.
    #[serde(default)]
    pub unit: Unit,
}

/// Hard failures while constructing a workspace. Everything coercible is
/// absorbed long before this point; what remains is file I/O.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    /// The workspace directory or one of its entries could not be written.
    #[error("failed to write workspace entry {}: {source}", .path.display())]
    Write {
        /// Path that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A source profile could not be read. Covers the misconfigured-store
    /// case where even the fallback files are absent.
    #[error("failed to read profile {}: {source}", .path.display())]
    ReadProfile {
        /// Profile path that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A source profile was not valid JSON.
    #[error("profile {} is not valid JSON: {source}", .path.display())]
    ParseProfile {
        /// Profile path that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// A generated document failed to encode.
    #[error("failed to encode generated document {}: {source}", .path.display())]
    Encode {
        /// Destination path of the document.
        path: PathBuf,
        /// Underlying encode error.
        #[source]
        source: serde_json::Error,
    },
}

/// A fully prepared execution workspace.
#[derive(Debug)]
pub struct Workspace {
    /// Directory holding the generated documents and the input model.
    pub dir: PathBuf,
    /// Path of the uploaded model inside the workspace.
    pub model: PathBuf,
    /// Generated machine document path (`printer.json`).
    pub machine_path: PathBuf,
    /// Generated process document path (`process.json`).
    pub process_path: PathBuf,
    /// Generated filament document path (`filament.json`).
    pub filament_path: PathBuf,
    /// The generated machine document.
    pub machine: MachineDoc,
    /// The generated process document.
    pub process: ProcessDoc,
    /// The generated filament document.
    pub filament: FilamentDoc,
    /// Source profiles the documents were derived from.
    pub sources: ResolvedProfiles,
    keep: bool,
}

impl Workspace {
    /// Build a workspace under the OS temp dir: resolve and load the source
    /// profiles, normalize all three documents, apply the request overrides,
    /// reconcile identity, and serialize the result.
    ///
    /// The mutation order is load-bearing and must not be reordered: the
    /// request nozzle lands after machine normalization, the layer clamp
    /// after the nozzle override, the infill override after process
    /// normalization, the signature copy after the machine's final mutation,
    /// and compatibility registration last.
    pub async fn build(
        profiles_root: &Path,
        params: &SliceParameters,
        model: &[u8],
        file_name: &str,
    ) -> Result<Workspace, WorkspaceError> {
        let dir = std::env::temp_dir().join(format!("slice-{}", uuid::Uuid::new_v4().simple()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| WorkspaceError::Write { path: dir.clone(), source })?;

        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("stl");
        let model_path = dir.join(format!("input.{}", extension));
        tokio::fs::write(&model_path, model)
            .await
            .map_err(|source| WorkspaceError::Write { path: model_path.clone(), source })?;

        let sources = resolver::resolve_profiles(profiles_root);
        let raw_machine: RawMachine = load_json(&sources.machine).await?;
        let raw_process: RawProcess = load_json(&sources.process).await?;
        let raw_filament: RawFilament = load_json(&sources.filament).await?;

        let mut machine = raw_machine.normalize();
        // The request always wins over the profile for the nozzle bore.
        machine.nozzle_diameter = vec![params.nozzle_diameter];

        let mut process = raw_process.normalize();
        let mut filament = raw_filament.normalize();

        process.layer_height = Some(
            params
                .layer_height
                .clamp(machine.min_layer_height, machine.max_layer_height),
        );
        let infill = params.infill.clamp(0.0, 1.0);
        process.sparse_infill_density = Some(format!("{}%", (infill * 100.0).round() as i64));

        compat::copy_machine_signature(&machine, &mut process, &mut filament);

        let printer_name = sources
            .preset_name
            .clone()
            .or_else(|| machine.name.clone())
            .unwrap_or_else(|| resolver::FALLBACK_PRESET.to_string());
        machine.name = Some(printer_name.clone());

        compat::register_compatible_printer(&printer_name, &mut process, &mut filament);

        let machine_path = dir.join("printer.json");
        let process_path = dir.join("process.json");
        let filament_path = dir.join("filament.json");
        write_json(&machine_path, &machine).await?;
        write_json(&process_path, &process).await?;
        write_json(&filament_path, &filament).await?;

        tracing::debug!(
            dir = %dir.display(),
            printer = printer_name,
            "workspace ready"
        );

        Ok(Workspace {
            dir,
            model: model_path,
            machine_path,
            process_path,
            filament_path,
            machine,
            process,
            filament,
            sources,
            keep: false,
        })
    }

    /// Keep the directory on disk after drop, for post-mortem inspection.
    pub fn persist(&mut self) {
        self.keep = true;
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        let dir = self.dir.clone();
        tokio::spawn(async move {
            tracing::trace!(dir = %dir.display(), "removing dropped workspace");
            let _ = tokio::fs::remove_dir_all(dir).await;
        });
    }
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, WorkspaceError> {
    let raw = tokio::fs::read(path)
        .await
        .map_err(|source| WorkspaceError::ReadProfile { path: path.to_owned(), source })?;
    serde_json::from_slice(&raw)
        .map_err(|source| WorkspaceError::ParseProfile { path: path.to_owned(), source })
}

async fn write_json<T: Serialize>(path: &Path, doc: &T) -> Result<(), WorkspaceError> {
    let raw = serde_json::to_vec_pretty(doc)
        .map_err(|source| WorkspaceError::Encode { path: path.to_owned(), source })?;
    tokio::fs::write(path, raw)
        .await
        .map_err(|source| WorkspaceError::Write { path: path.to_owned(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params() -> SliceParameters {
        SliceParameters {
            material: "PLA".to_string(),
            infill: 0.2,
            layer_height: 0.5,
            nozzle_diameter: 0.4,
            unit: Unit::Mm,
        }
    }

    fn seed_store() -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "slice-api-profiles-{}",
            uuid::Uuid::new_v4().simple()
        ));
        for sub in ["printer", "process", "filament"] {
            std::fs::create_dir_all(root.join(sub)).unwrap();
        }
        // Deliberately sparse machine profile: no bed shape, technology, or
        // nozzle list.
        std::fs::write(
            root.join(resolver::FALLBACK_MACHINE),
            json!({ "name": "Seeded Printer" }).to_string(),
        )
        .unwrap();
        std::fs::write(
            root.join(resolver::FALLBACK_PROCESS),
            json!({ "layer_height": 0.5 }).to_string(),
        )
        .unwrap();
        std::fs::write(
            root.join(resolver::FALLBACK_FILAMENT),
            json!({ "nozzle_temperature": [220] }).to_string(),
        )
        .unwrap();
        root
    }

    #[tokio::test]
    async fn test_end_to_end_document_generation() {
        let store = seed_store();
        let workspace = Workspace::build(&store, &params(), b"solid cube", "cube.stl")
            .await
            .unwrap();

        // Requested 0.5 clamps to the machine ceiling.
        assert_eq!(workspace.process.layer_height, Some(0.30));
        assert_eq!(workspace.process.sparse_infill_density.as_deref(), Some("20%"));
        assert_eq!(workspace.machine.nozzle_diameter, vec![0.4]);

        let signature = workspace.process.signature.as_ref().unwrap();
        assert_eq!(signature.nozzle_diameter, vec![0.4]);
        assert_eq!(Some(signature), workspace.filament.signature.as_ref());

        let printer_name = workspace.machine.name.clone().unwrap();
        assert_eq!(printer_name, resolver::FALLBACK_PRESET);
        assert!(workspace.process.compatible_printers.contains(&printer_name));
        assert!(workspace.filament.compatible_printers.contains(&printer_name));
        assert_eq!(
            workspace.filament.nozzle_temperature,
            Some(vec!["220".to_string()])
        );

        // Everything the engine needs is on disk.
        assert!(workspace.model.is_file());
        assert_eq!(workspace.model.file_name().unwrap(), "input.stl");
        for path in [
            &workspace.machine_path,
            &workspace.process_path,
            &workspace.filament_path,
        ] {
            assert!(path.is_file());
        }
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&workspace.process_path).unwrap()).unwrap();
        assert_eq!(written["layer_height"], json!(0.30));
        assert_eq!(written["sparse_infill_density"], json!("20%"));
        assert_eq!(written["nozzle_diameter"], json!([0.4]));

        std::fs::remove_dir_all(&store).unwrap();
    }

    #[tokio::test]
    async fn test_layer_height_clamp_floor() {
        let store = seed_store();
        let mut p = params();
        p.layer_height = 0.05;
        let workspace = Workspace::build(&store, &p, b"solid", "part.stl").await.unwrap();
        assert_eq!(workspace.process.layer_height, Some(0.15));

        let mut p = params();
        p.layer_height = 0.2;
        let workspace = Workspace::build(&store, &p, b"solid", "part.stl").await.unwrap();
        assert_eq!(workspace.process.layer_height, Some(0.2));

        std::fs::remove_dir_all(&store).unwrap();
    }

    #[tokio::test]
    async fn test_infill_fraction_formatting() {
        let store = seed_store();
        // Out-of-range fractions clamp rather than error; the endpoint is
        // the place that rejects them.
        for (infill, expected) in [(0.0, "0%"), (0.333, "33%"), (1.0, "100%"), (7.0, "100%")] {
            let mut p = params();
            p.infill = infill;
            let workspace = Workspace::build(&store, &p, b"solid", "part.stl").await.unwrap();
            assert_eq!(
                workspace.process.sparse_infill_density.as_deref(),
                Some(expected)
            );
        }
        std::fs::remove_dir_all(&store).unwrap();
    }

    #[tokio::test]
    async fn test_missing_profile_is_a_hard_error() {
        let root = std::env::temp_dir().join(format!(
            "slice-api-empty-{}",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::create_dir_all(&root).unwrap();

        let err = Workspace::build(&root, &params(), b"solid", "part.stl")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::ReadProfile { .. }));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_model_extension_hint() {
        let store = seed_store();
        let workspace = Workspace::build(&store, &params(), b"3mf bytes", "part.3mf")
            .await
            .unwrap();
        assert_eq!(workspace.model.file_name().unwrap(), "input.3mf");

        let workspace = Workspace::build(&store, &params(), b"bytes", "noextension")
            .await
            .unwrap();
        assert_eq!(workspace.model.file_name().unwrap(), "input.stl");

        std::fs::remove_dir_all(&store).unwrap();
    }
}
