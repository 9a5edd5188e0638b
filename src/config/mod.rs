//! Configuration loading and management
//!
//! Configuration is read from a YAML file whose path is given by the
//! `DOCKET_CONFIG` environment variable. Every field has a default, so an
//! empty file (or no file at all) yields a working in-memory setup.
//!
//! ```yaml
//! server:
//!   host: 0.0.0.0
//!   port: 8080
//! storage:
//!   backend: mongodb
//!   uri: mongodb://localhost:27017
//!   database: docket
//! sequences:
//!   max_attempts: 8
//! pagination:
//!   default_limit: 20
//!   max_limit: 100
//! logging:
//!   filter: docket=info,tower_http=info
//! ```

use crate::core::error::{ConfigError, DocketResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const CONFIG_PATH_ENV: &str = "DOCKET_CONFIG";
pub const HOST_ENV: &str = "DOCKET_HOST";
pub const PORT_ENV: &str = "DOCKET_PORT";
pub const MONGODB_URI_ENV: &str = "DOCKET_MONGODB_URI";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub sequences: SequenceConfig,
    pub pagination: PaginationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    InMemory,
    Mongodb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub uri: String,
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::InMemory,
            uri: "mongodb://localhost:27017".to_string(),
            database: "docket".to_string(),
        }
    }
}

/// Code issuing: how many compare-and-set rounds before giving up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub max_attempts: u32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self { max_attempts: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "docket=info,tower_http=info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> DocketResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::Parse {
                file: Some(path.display().to_string()),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> DocketResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from `DOCKET_CONFIG` (or defaults), apply environment
    /// overrides, and validate
    pub fn load() -> DocketResult<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_yaml_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DOCKET_HOST` / `DOCKET_PORT` / `DOCKET_MONGODB_URI` as read by `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup(HOST_ENV) {
            self.server.host = host;
        }
        if let Some(port) = lookup(PORT_ENV) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: port.clone(),
                message: "not a port number".to_string(),
            })?;
        }
        if let Some(uri) = lookup(MONGODB_URI_ENV) {
            self.storage.uri = uri;
            self.storage.backend = StorageBackend::Mongodb;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: "0".to_string(),
                message: "port must be non-zero".to_string(),
            });
        }
        if self.sequences.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sequences.max_attempts".to_string(),
                value: "0".to_string(),
                message: "at least one attempt is required".to_string(),
            });
        }
        if self.pagination.max_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(ConfigError::InvalidValue {
                field: "pagination.default_limit".to_string(),
                value: self.pagination.default_limit.to_string(),
                message: format!(
                    "must not exceed pagination.max_limit ({})",
                    self.pagination.max_limit
                ),
            });
        }
        if self.storage.backend == StorageBackend::Mongodb && self.storage.database.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "storage.database".to_string(),
                value: String::new(),
                message: "a database name is required for mongodb".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(AppConfig::from_yaml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = AppConfig::from_yaml_str(
            r#"
server:
  port: 9090
storage:
  backend: mongodb
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.backend, StorageBackend::Mongodb);
        assert_eq!(config.storage.database, "docket");
        assert_eq!(config.pagination, PaginationConfig::default());
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|name| match name {
                PORT_ENV => Some("8081".to_string()),
                MONGODB_URI_ENV => Some("mongodb://db:27017".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.server.port, 8081);
        assert_eq!(config.storage.backend, StorageBackend::Mongodb);
        assert_eq!(config.storage.uri, "mongodb://db:27017");
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|name| (name == PORT_ENV).then(|| "eighty".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_rejects_inverted_limits() {
        let mut config = AppConfig::default();
        config.pagination.default_limit = 500;
        assert!(config.validate().is_err());

        config.pagination.default_limit = 10;
        config.sequences.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
