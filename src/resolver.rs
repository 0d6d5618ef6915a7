//! Locating the three source profile documents.
//!
//! A profile store either carries a bundle manifest describing candidate
//! paths per document, or it carries the fixed fallback files. Resolution
//! never fails: a missing, malformed, or partially-resolvable manifest just
//! means the fallback triple is used.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Manifest file a profile bundle may ship at the store root.
pub const BUNDLE_MANIFEST: &str = "bundle_structure.json";

/// Fallback machine profile, relative to the store root.
pub const FALLBACK_MACHINE: &str = "printer/default_printer.json";
/// Fallback process profile, relative to the store root.
pub const FALLBACK_PROCESS: &str = "process/default_process.json";
/// Fallback filament profile, relative to the store root.
pub const FALLBACK_FILAMENT: &str = "filament/default_filament.json";
/// Printer display name used when neither manifest nor machine profile
/// provide one.
pub const FALLBACK_PRESET: &str = "Generic FFF Printer 0.4 nozzle";

/// The source documents a request will be built from. Always a complete
/// triple, never partial.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedProfiles {
    /// Machine profile path.
    pub machine: PathBuf,
    /// Process profile path.
    pub process: PathBuf,
    /// Filament profile path.
    pub filament: PathBuf,
    /// Printer display name, when the resolution source knows one. The
    /// fallback triple always names one; a manifest may not.
    pub preset_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BundleManifest {
    bundle_type: Option<String>,
    printer_config: Option<Vec<String>>,
    process_config: Option<Vec<String>>,
    filament_config: Option<Vec<String>>,
    printer_preset_name: Option<String>,
}

/// Resolve the profile triple under `root`.
pub fn resolve_profiles(root: &Path) -> ResolvedProfiles {
    if let Some(manifest) = load_manifest(root) {
        if let Some(resolved) = manifest.resolve(root) {
            return resolved;
        }
        tracing::debug!(
            root = %root.display(),
            "bundle manifest present but unresolvable, using fallback profiles"
        );
    }

    ResolvedProfiles {
        machine: root.join(FALLBACK_MACHINE),
        process: root.join(FALLBACK_PROCESS),
        filament: root.join(FALLBACK_FILAMENT),
        preset_name: Some(FALLBACK_PRESET.to_string()),
    }
}

fn load_manifest(root: &Path) -> Option<BundleManifest> {
    let raw = std::fs::read(root.join(BUNDLE_MANIFEST)).ok()?;
    serde_json::from_slice(&raw).ok()
}

impl BundleManifest {
    /// A manifest is authoritative only when it names a bundle type and
    /// printer candidates, and every document resolves to an existing file.
    fn resolve(&self, root: &Path) -> Option<ResolvedProfiles> {
        self.bundle_type.as_ref()?;
        let machine = first_existing(root, self.printer_config.as_deref()?)?;
        let process = first_existing(root, self.process_config.as_deref().unwrap_or_default())?;
        let filament = first_existing(root, self.filament_config.as_deref().unwrap_or_default())?;
        Some(ResolvedProfiles {
            machine,
            process,
            filament,
            preset_name: self.printer_preset_name.clone(),
        })
    }
}

fn first_existing(root: &Path, candidates: &[String]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|relative| root.join(relative))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct StoreDir(PathBuf);

    impl StoreDir {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!(
                "slice-api-store-{}",
                uuid::Uuid::new_v4().simple()
            ));
            std::fs::create_dir_all(&root).unwrap();
            StoreDir(root)
        }

        fn write(&self, relative: &str, contents: &str) {
            let path = self.0.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
    }

    impl Drop for StoreDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn test_manifest_absent_falls_back_deterministically() {
        let store = StoreDir::new();
        let first = resolve_profiles(&store.0);
        let second = resolve_profiles(&store.0);
        assert_eq!(first, second);
        assert_eq!(first.machine, store.0.join(FALLBACK_MACHINE));
        assert_eq!(first.preset_name.as_deref(), Some(FALLBACK_PRESET));
    }

    #[test]
    fn test_manifest_picks_first_existing_candidate() {
        let store = StoreDir::new();
        store.write("printer/real.json", "{}");
        store.write("process/real.json", "{}");
        store.write("filament/real.json", "{}");
        store.write(
            BUNDLE_MANIFEST,
            &json!({
                "bundle_type": "config bundle",
                "printer_config": ["printer/missing.json", "printer/real.json"],
                "process_config": ["process/real.json"],
                "filament_config": ["filament/real.json"],
                "printer_preset_name": "Store Printer 0.4",
            })
            .to_string(),
        );

        let resolved = resolve_profiles(&store.0);
        assert_eq!(resolved.machine, store.0.join("printer/real.json"));
        assert_eq!(resolved.preset_name.as_deref(), Some("Store Printer 0.4"));
    }

    #[test]
    fn test_unresolvable_manifest_falls_back() {
        let store = StoreDir::new();
        // Candidate files intentionally absent.
        store.write(
            BUNDLE_MANIFEST,
            &json!({
                "bundle_type": "config bundle",
                "printer_config": ["printer/missing.json"],
                "process_config": ["process/missing.json"],
                "filament_config": ["filament/missing.json"],
            })
            .to_string(),
        );
        let resolved = resolve_profiles(&store.0);
        assert_eq!(resolved.machine, store.0.join(FALLBACK_MACHINE));
    }

    #[test]
    fn test_malformed_manifest_is_swallowed() {
        let store = StoreDir::new();
        store.write(BUNDLE_MANIFEST, "not json at all {");
        let resolved = resolve_profiles(&store.0);
        assert_eq!(resolved.filament, store.0.join(FALLBACK_FILAMENT));

        // A manifest missing the required keys is equally non-authoritative.
        store.write(BUNDLE_MANIFEST, &json!({ "bundle_type": "x" }).to_string());
        let resolved = resolve_profiles(&store.0);
        assert_eq!(resolved.machine, store.0.join(FALLBACK_MACHINE));
    }
}
