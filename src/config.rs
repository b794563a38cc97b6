//! Host configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Free-memory figure used when the host does not configure one.
pub const DEFAULT_AVAILABLE_SPACE: u64 = 1 << 30;

/// Settings the host applies to every plugin session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Memory budget for the buffer suite, also reported as free space.
    pub available_space: u64,
    /// Where the persisted descriptor registry is stored.
    pub registry_path: Option<PathBuf>,
    /// Host name reported to plugins.
    pub host_name: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            available_space: DEFAULT_AVAILABLE_SPACE,
            registry_path: None,
            host_name: String::from("suitehost"),
        }
    }
}

impl HostConfig {
    /// Read a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read host config: {:?}", path))?;
        serde_json::from_str(&content).context(format!("Failed to parse host config: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.json");
        fs::write(&path, r#"{ "available_space": 16777216 }"#).unwrap();

        let config = HostConfig::load(&path).unwrap();
        assert_eq!(config.available_space, 16 * 1024 * 1024);
        assert_eq!(config.registry_path, None);
        assert_eq!(config.host_name, "suitehost");
    }

    #[test]
    fn test_missing_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(HostConfig::load(&dir.path().join("nope.json")).is_err());
    }
}
