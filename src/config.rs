//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub table: TableDefaults,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied to form data that leaves a setting out
#[derive(Debug, Clone, Deserialize)]
pub struct TableDefaults {
    /// Server page length when the chart does not set one
    #[serde(default = "default_page_length")]
    pub page_length: usize,

    /// Auto-refresh interval in seconds, 0 disables it
    #[serde(default)]
    pub refresh_interval: f64,

    /// Datasource key (`"<id>__<type>"`) for charts without one
    #[serde(default)]
    pub datasource: Option<String>,
}

fn default_page_length() -> usize {
    crate::form_data::DEFAULT_PAGE_LENGTH
}

impl Default for TableDefaults {
    fn default() -> Self {
        Self {
            page_length: default_page_length(),
            refresh_interval: 0.0,
            datasource: None,
        }
    }
}

impl TableDefaults {
    /// Insert defaults for keys missing from a form-data object
    pub fn fill_form_data(&self, form_data: &mut Value) {
        let Some(object) = form_data.as_object_mut() else {
            return;
        };

        let missing = |object: &serde_json::Map<String, Value>, keys: &[&str]| {
            keys.iter().all(|k| object.get(*k).map_or(true, Value::is_null))
        };

        if missing(object, &["server_page_length"]) {
            object.insert("server_page_length".into(), self.page_length.into());
        }
        if missing(object, &["refresh_interval", "refreshInterval"]) && self.refresh_interval > 0.0 {
            object.insert("refresh_interval".into(), self.refresh_interval.to_string().into());
        }
        if let Some(datasource) = &self.datasource {
            if missing(object, &["datasource"]) {
                object.insert("datasource".into(), datasource.clone().into());
            }
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("realtime-table").join("config.toml")),
            Some(PathBuf::from("./realtime-table.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Table overrides
        if let Some(length) = lookup("REALTIME_TABLE_PAGE_LENGTH").and_then(|v| v.parse().ok()) {
            self.table.page_length = length;
        }
        if let Some(interval) = lookup("REALTIME_TABLE_REFRESH_INTERVAL").and_then(|v| v.parse().ok()) {
            self.table.refresh_interval = interval;
        }
        if let Some(datasource) = lookup("REALTIME_TABLE_DATASOURCE") {
            self.table.datasource = Some(datasource);
        }

        // Logging overrides
        if let Some(level) = lookup("REALTIME_TABLE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("REALTIME_TABLE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Realtime Table Configuration
#
# Environment variables override these settings:
# - REALTIME_TABLE_PAGE_LENGTH
# - REALTIME_TABLE_REFRESH_INTERVAL
# - REALTIME_TABLE_DATASOURCE
# - REALTIME_TABLE_LOG_LEVEL
# - REALTIME_TABLE_LOG_FORMAT

[table]
# Rows per page when a chart enables server pagination without a page length
page_length = 50

# Auto-refresh interval in seconds for charts that do not set one (0 = off)
refresh_interval = 0

# Datasource key for charts without one, e.g. "3__table"
# datasource = "3__table"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/realtime-table.log"
"#
    .to_string()
}
