use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Path the ephemeral store uses on its in-memory filesystem.
pub const EPHEMERAL_PATH: &str = "/memories/memories.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Which filesystem backs the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Real operating system filesystem
    #[default]
    LocalFileSystem,

    /// Process-local in-memory filesystem
    InMemory,
}

/// How the store replaces the backing file on save.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Truncate and write the file in place. A crash mid-write can leave a
    /// truncated document.
    #[default]
    Direct,

    /// Write a sibling `.tmp` file, then rename it over the target.
    Atomic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_path")]
    pub path: PathBuf,

    #[serde(default)]
    pub backend: BackendType,

    #[serde(default)]
    pub write_mode: WriteMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            backend: BackendType::default(),
            write_mode: WriteMode::default(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from("memories.json")
}

impl StoreConfig {
    /// Configuration for an ephemeral in-memory store.
    pub fn ephemeral() -> Self {
        Self {
            path: PathBuf::from(EPHEMERAL_PATH),
            backend: BackendType::InMemory,
            write_mode: WriteMode::Direct,
        }
    }

    /// Load a JSON config file. A missing file yields the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "path".to_string(),
                message: "Store path cannot be empty".to_string(),
            });
        }
        if self.path.file_name().is_none() {
            return Err(ConfigError::InvalidValue {
                field: "path".to_string(),
                message: format!("Store path {} does not name a file", self.path.display()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.path, PathBuf::from("memories.json"));
        assert_eq!(config.backend, BackendType::LocalFileSystem);
        assert_eq!(config.write_mode, WriteMode::Direct);
    }

    #[test]
    fn test_parse_full_config() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"path": "/var/lib/memories/store.json", "backend": "in_memory", "write_mode": "atomic"}"#,
        )
        .unwrap();

        assert_eq!(config.path, PathBuf::from("/var/lib/memories/store.json"));
        assert_eq!(config.backend, BackendType::InMemory);
        assert_eq!(config.write_mode, WriteMode::Atomic);
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert_eq!(StoreConfig::from_file(&missing).unwrap(), StoreConfig::default());

        let file = temp_dir.path().join("config.json");
        std::fs::write(&file, r#"{"write_mode": "atomic"}"#).unwrap();
        let config = StoreConfig::from_file(&file).unwrap();
        assert_eq!(config.write_mode, WriteMode::Atomic);

        std::fs::write(&file, "not json").unwrap();
        assert!(matches!(
            StoreConfig::from_file(&file),
            Err(ConfigError::Json(_))
        ));

        std::fs::write(&file, r#"{"path": ""}"#).unwrap();
        assert!(matches!(
            StoreConfig::from_file(&file),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_directory_like_path() {
        let config = StoreConfig {
            path: PathBuf::from("/"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(StoreConfig::ephemeral().validate().is_ok());
    }

    #[test]
    fn test_enum_names() {
        assert_eq!(WriteMode::from_str("atomic").unwrap(), WriteMode::Atomic);
        assert_eq!(BackendType::InMemory.to_string(), "in_memory");
    }
}
