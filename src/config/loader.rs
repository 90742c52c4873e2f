//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{AppConfig, BackendList, RateLimiterSection};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "io error: {}", e),
            ConfigError::Parse(e) => write!(f, "parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate the full configuration document from a YAML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;

    let backends: BackendList = serde_yaml::from_str(&content).map_err(ConfigError::Parse)?;
    let rate_limiter: RateLimiterSection = serde_yaml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&backends, &rate_limiter.rate_limiter).map_err(ConfigError::Validation)
}

/// Load just the backend URL list — used by the config watcher, which
/// only needs to drive `Pool::Update`.
pub fn load_backend_urls(path: &Path) -> Result<Vec<String>, ConfigError> {
    load_config(path).map(|cfg| cfg.servers)
}
