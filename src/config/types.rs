//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::defaults::{
    default_autosave_interval, default_log_level, default_prefix, default_storage_path,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Command handling and ownership.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Command prefix (e.g., "!").
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Owner user ID. When unset, the owner is assigned with `setowner`.
    pub owner: Option<String>,
    /// Seconds between plugin autosaves.
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval: u64,
    /// Port for the Prometheus `/metrics` endpoint. 0 disables it.
    #[serde(default)]
    pub metrics_port: u16,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            owner: None,
            autosave_interval: default_autosave_interval(),
            metrics_port: 0,
        }
    }
}

/// Where plugin documents are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory for `<name>.json` documents.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginsConfig {
    /// Catalog entries that are not loaded at startup.
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bot.prefix, "!");
        assert_eq!(config.bot.autosave_interval, 1800);
        assert_eq!(config.bot.metrics_port, 0);
        assert_eq!(config.storage.path, "data");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn full_file() {
        let config: Config = toml::from_str(
            r#"
[bot]
prefix = "?"
owner = "1234"
autosave_interval = 60
metrics_port = 9100

[storage]
path = "/var/lib/plugbot"

[plugins]
disabled = ["wordsearch"]

[logging]
level = "debug"
format = "json"
"#,
        )
        .unwrap();
        assert_eq!(config.bot.prefix, "?");
        assert_eq!(config.bot.owner.as_deref(), Some("1234"));
        assert_eq!(config.plugins.disabled, vec!["wordsearch"]);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/plugbot.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
