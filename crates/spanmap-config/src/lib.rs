use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Error
// ─────────────────────────────────────────────────────────────────────────────

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment keys
// ─────────────────────────────────────────────────────────────────────────────

pub const ENV_CONFIG_FILE: &str = "SPANMAP_CONFIG";
pub const ENV_HOST: &str = "SPANMAP_HOST";
pub const ENV_PORT: &str = "SPANMAP_PORT";
pub const ENV_DB_PATH: &str = "SPANMAP_DB_PATH";
pub const ENV_INACTIVE_THRESHOLD_SECS: &str = "SPANMAP_INACTIVE_THRESHOLD_SECS";
pub const ENV_SUBSCRIBER_BUFFER: &str = "SPANMAP_SUBSCRIBER_BUFFER";
pub const ENV_LEGACY_IMPORT: &str = "SPANMAP_LEGACY_IMPORT";

/// Services idle for longer than this are reported inactive.
pub const DEFAULT_INACTIVE_THRESHOLD_SECS: u64 = 5 * 60;

// ─────────────────────────────────────────────────────────────────────────────
// Server Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub inactive_threshold_secs: u64,
    /// Frames buffered per websocket subscriber before updates are dropped.
    pub subscriber_buffer: usize,
    /// JSON export of legacy service documents to import once at startup.
    pub legacy_import_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            database_path: PathBuf::from("data/spanmap.db"),
            inactive_threshold_secs: DEFAULT_INACTIVE_THRESHOLD_SECS,
            subscriber_buffer: 256,
            legacy_import_path: None,
        }
    }
}

impl ServerConfig {
    /// Loads defaults, then the JSON file named by `SPANMAP_CONFIG`, then env overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable lookup.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(ENV_CONFIG_FILE) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_json::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = lookup(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.port = parse_value(ENV_PORT, &port)?;
        }
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup(ENV_INACTIVE_THRESHOLD_SECS) {
            self.inactive_threshold_secs = parse_value(ENV_INACTIVE_THRESHOLD_SECS, &secs)?;
        }
        if let Some(buffer) = lookup(ENV_SUBSCRIBER_BUFFER) {
            self.subscriber_buffer = parse_value(ENV_SUBSCRIBER_BUFFER, &buffer)?;
            if self.subscriber_buffer == 0 {
                return Err(ConfigError::Invalid { key: ENV_SUBSCRIBER_BUFFER, value: buffer });
            }
        }
        if let Some(path) = lookup(ENV_LEGACY_IMPORT).filter(|p| !p.is_empty()) {
            self.legacy_import_path = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn inactive_threshold(&self) -> Duration {
        Duration::from_secs(self.inactive_threshold_secs)
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid { key, value: value.to_string() })
}
