//! Configuration management for RAX Drive Server
//!
//! Values come from built-in defaults, then an optional `config.toml`, then
//! `RAX_DRIVE_*` environment variables. Everything here is read once at
//! startup; changing it requires a restart.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_PORT: i64 = 2121;
const DEFAULT_STORAGE_ROOT: &str = "./storage";
const DEFAULT_MAX_CLIENTS: i64 = 32;
const DEFAULT_MAX_COMMAND_LENGTH: i64 = 4096;
const DEFAULT_MAX_UPLOAD_SIZE_MB: i64 = 100;

/// Upper bound for `max_upload_size_mb` (1 TiB)
const MAX_UPLOAD_SIZE_MB: u64 = 1024 * 1024;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// IP address the command listener binds to
    pub bind_address: String,

    /// Port for the command listener. `0` picks an ephemeral port.
    pub port: u16,

    /// Directory every client path is confined to
    pub storage_root: String,

    /// Maximum concurrent sessions
    pub max_clients: usize,

    /// Maximum length of a single command line, in bytes
    pub max_command_length: usize,

    /// Maximum upload size in MB
    pub max_upload_size_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT as u16,
            storage_root: DEFAULT_STORAGE_ROOT.to_string(),
            max_clients: DEFAULT_MAX_CLIENTS as usize,
            max_command_length: DEFAULT_MAX_COMMAND_LENGTH as usize,
            max_upload_size_mb: DEFAULT_MAX_UPLOAD_SIZE_MB as u64,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        // Docker layout first, then the working directory
        let config_paths = ["rax-drive-server/config", "config"];

        let mut builder = Config::builder()
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("port", DEFAULT_PORT)?
            .set_default("storage_root", DEFAULT_STORAGE_ROOT)?
            .set_default("max_clients", DEFAULT_MAX_CLIENTS)?
            .set_default("max_command_length", DEFAULT_MAX_COMMAND_LENGTH)?
            .set_default("max_upload_size_mb", DEFAULT_MAX_UPLOAD_SIZE_MB)?;

        for config_path in config_paths {
            builder = builder.add_source(File::with_name(config_path).required(false));
        }

        let settings = builder
            .add_source(Environment::with_prefix("RAX_DRIVE").try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_root.trim().is_empty() {
            return Err(ConfigError::Message("storage_root cannot be empty".into()));
        }

        if self.max_clients == 0 {
            return Err(ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_command_length < 16 {
            return Err(ConfigError::Message(
                "max_command_length must be at least 16 bytes".into(),
            ));
        }

        if self.max_upload_size_mb == 0 {
            return Err(ConfigError::Message(
                "max_upload_size_mb must be greater than 0".into(),
            ));
        }

        if self.max_upload_size_mb > MAX_UPLOAD_SIZE_MB {
            return Err(ConfigError::Message(format!(
                "max_upload_size_mb must be at most {MAX_UPLOAD_SIZE_MB}"
            )));
        }

        Ok(())
    }

    /// Get bind address and port as socket address
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Get storage root as PathBuf
    pub fn storage_root_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_root)
    }

    /// Get maximum upload size in bytes
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }
}
