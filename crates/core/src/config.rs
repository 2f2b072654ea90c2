//! Per-tree configuration file parsing (.dirsnap.toml)

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SnapshotError};

/// Config file name, looked up in the scanned root
pub const CONFIG_FILE: &str = ".dirsnap.toml";

/// Per-tree snapshot configuration
#[derive(Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory where snapshot files are kept
    pub snapshot_dir: Option<PathBuf>,

    /// Snapshot file stem, overriding the root's base name
    pub id: Option<String>,
}

impl Config {
    /// Load config from the scanned root.
    ///
    /// Returns the default config if `.dirsnap.toml` doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content =
            std::fs::read_to_string(&config_path).map_err(|source| SnapshotError::Read {
                path: config_path.clone(),
                source,
            })?;
        toml::from_str(&content).map_err(|err| SnapshotError::Config {
            path: config_path,
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
snapshot_dir = ".snapshots"
id = "myproject"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.snapshot_dir, Some(PathBuf::from(".snapshots")));
        assert_eq!(config.id.as_deref(), Some("myproject"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_root() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "id = \"tracked\"\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.id.as_deref(), Some("tracked"));
        assert_eq!(config.snapshot_dir, None);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "snapshot_dir = 42\n").unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, SnapshotError::Config { .. }));
    }
}
