//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, BotConfig, StorageConfig, ...)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that report every problem at once

mod defaults;
mod types;
mod validation;

pub use defaults::DEFAULT_AUTOSAVE_SECS;
pub use types::{BotConfig, Config, ConfigError, LogFormat, LoggingConfig, PluginsConfig, StorageConfig};
pub use validation::{ValidationError, validate};
