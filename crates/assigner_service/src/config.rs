//! Service configuration
//!
//! Layered as built-in defaults, then an optional TOML file, then
//! `ASSIGNER_*` environment variables. A bare `PORT` variable sets the port
//! when `ASSIGNER_PORT` is absent.

use crate::errors::ServiceError;
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "assigner.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub log_level: String,
    /// Check the model against its `.hash` sidecar at start-up
    pub verify_hash: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            model_path: PathBuf::from("model/ticket_assigner.json"),
            log_level: "info".to_string(),
            verify_hash: false,
        }
    }
}

impl ServiceConfig {
    /// Load from `config_path` (or `assigner.toml` if present) and the
    /// process environment
    pub fn load(config_path: Option<&Path>) -> Result<Self, ServiceError> {
        let vars: config::Map<String, String> = std::env::vars().collect();
        Self::load_from(config_path, vars)
    }

    /// Load with an explicit set of environment variables
    pub fn load_from(
        config_path: Option<&Path>,
        vars: config::Map<String, String>,
    ) -> Result<Self, ServiceError> {
        let resolved_path = match config_path {
            Some(path) if !path.exists() => {
                return Err(ServiceError::InvalidConfig(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                path.exists().then_some(path)
            }
        };

        let defaults = ServiceConfig::default();
        let mut builder = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("model_path", defaults.model_path.to_string_lossy().to_string())?
            .set_default("log_level", defaults.log_level)?
            .set_default("verify_hash", defaults.verify_hash)?;

        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }

        let bare_port = if vars.contains_key("ASSIGNER_PORT") {
            None
        } else {
            vars.get("PORT").cloned()
        };

        builder = builder
            .add_source(
                Environment::with_prefix("ASSIGNER")
                    .try_parsing(true)
                    .source(Some(vars)),
            )
            .set_override_option("port", bare_port)?;

        let config: ServiceConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.host.trim().is_empty() {
            return Err(ServiceError::InvalidConfig("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ServiceError::InvalidConfig("port must be non-zero".into()));
        }
        if self.model_path.as_os_str().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "model_path must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// `host:port` listen address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Location of the hash sidecar next to the model file
    pub fn hash_path(&self) -> PathBuf {
        self.model_path.with_extension("hash")
    }
}
