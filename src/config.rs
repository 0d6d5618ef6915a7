//! Code for the configuration of the application.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The configuration of the application.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Root of the read-only profile store.
    #[serde(default = "default_profiles_root")]
    pub profiles_root: PathBuf,
    /// Which slicing engine to invoke.
    #[serde(default)]
    pub slicer: crate::slicer::Config,
    /// Retain request workspaces on disk after the response, for debugging.
    #[serde(default)]
    pub keep_workspaces: bool,
}

fn default_profiles_root() -> PathBuf {
    PathBuf::from("profiles")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles_root: default_profiles_root(),
            slicer: Default::default(),
            keep_workspaces: false,
        }
    }
}

impl Config {
    /// Parse a configuration from a toml file.
    pub fn from_file(file: &PathBuf) -> Result<Self> {
        let config = std::fs::read_to_string(file)?;
        Self::from_str(&config)
    }

    /// Parse a configuration from a toml string.
    pub fn from_str(config: &str) -> Result<Self> {
        Ok(toml::from_str(config)?)
    }
}
