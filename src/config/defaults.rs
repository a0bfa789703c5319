//! Default value functions for configuration.

/// Plugins are saved every 30 minutes unless configured otherwise.
pub const DEFAULT_AUTOSAVE_SECS: u64 = 30 * 60;

pub fn default_prefix() -> String {
    "!".to_string()
}

pub fn default_autosave_interval() -> u64 {
    DEFAULT_AUTOSAVE_SECS
}

pub fn default_storage_path() -> String {
    "data".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}
