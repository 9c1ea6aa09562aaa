//! Translator configuration.
//!
//! Host-facing knobs that do not belong in a container specification:
//! where to read the GID map, which device tree to mirror for privileged
//! containers, and how the runtime marks its processes.
//!
//! Resolution order for [`TranslatorConfig::load`]:
//! 1. The JSON file named by `MAGIKSPEC_CONFIG`
//! 2. `<config dir>/magikspec/config.json` if it exists
//! 3. Built-in defaults

use crate::constants::{
    CONFIG_ENV, DEV_ROOT, GID_MAP_PATH, RUNTIME_MARKER_ENV, RUNTIME_MARKER_VALUE,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for [`crate::translate::Translator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// GID map consulted under rootless execution.
    pub gid_map_path: PathBuf,
    /// Device tree mirrored into privileged containers.
    pub dev_root: PathBuf,
    /// Name of the environment variable marking the runtime.
    pub marker_env: String,
    /// Value of the marker variable.
    pub marker_value: String,
    /// Forces rootless detection on or off. `None` probes the host.
    pub rootless: Option<bool>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            gid_map_path: PathBuf::from(GID_MAP_PATH),
            dev_root: PathBuf::from(DEV_ROOT),
            marker_env: RUNTIME_MARKER_ENV.to_string(),
            marker_value: RUNTIME_MARKER_VALUE.to_string(),
            rootless: None,
        }
    }
}

impl TranslatorConfig {
    /// Loads configuration from the environment or the user config dir.
    pub fn load() -> Result<Self> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| Error::InvalidConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded translator config from {}", path.display());
        Ok(config)
    }

    /// Returns the per-user config file location.
    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("magikspec").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = TranslatorConfig::default();
        assert_eq!(config.gid_map_path, PathBuf::from("/proc/self/gid_map"));
        assert_eq!(config.dev_root, PathBuf::from("/dev"));
        assert_eq!(config.marker_env, "container");
        assert_eq!(config.rootless, None);
    }

    #[test]
    fn test_from_file_partial() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, r#"{"rootless": true, "marker_value": "test"}"#).unwrap();

        let config = TranslatorConfig::from_file(&path).unwrap();
        assert_eq!(config.rootless, Some(true));
        assert_eq!(config.marker_value, "test");
        assert_eq!(config.dev_root, PathBuf::from("/dev"));
    }

    #[test]
    fn test_from_file_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = TranslatorConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
