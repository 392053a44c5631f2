//! Process configuration. The only knob is the listening port; everything
//! else follows the host environment.

use std::env;
use std::path::PathBuf;
use thiserror::Error;

pub(crate) const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("PORT must be a number between 1 and 65535, got {0:?}")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub temp_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT").map(|v| v.trim().to_string()) {
            None => DEFAULT_PORT,
            Some(v) if v.is_empty() => DEFAULT_PORT,
            Some(v) => match v.parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => return Err(ConfigError::InvalidPort(v)),
            },
        };

        Ok(Self {
            host: "0.0.0.0".to_string(),
            port,
            temp_dir: env::temp_dir(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-request export settings shared with the handlers.
#[derive(Debug, Clone)]
pub(crate) struct ExportSettings {
    pub temp_dir: PathBuf,
}

impl From<&ServerConfig> for ExportSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
        }
    }
}
