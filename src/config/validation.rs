//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("bot.prefix must not be empty")]
    EmptyPrefix,
    #[error("bot.prefix must not contain whitespace, got {0:?}")]
    PrefixWhitespace(String),
    #[error("bot.autosave_interval must be at least 1 second")]
    ZeroAutosave,
    #[error("storage.path parent directory does not exist: {0}")]
    StoragePathInvalid(String),
    #[error("plugins.disabled lists a reserved name: {0}")]
    ReservedPlugin(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let prefix = &config.bot.prefix;
    if prefix.is_empty() {
        errors.push(ValidationError::EmptyPrefix);
    } else if prefix.chars().any(char::is_whitespace) {
        errors.push(ValidationError::PrefixWhitespace(prefix.clone()));
    }

    if config.bot.autosave_interval == 0 {
        errors.push(ValidationError::ZeroAutosave);
    }

    // The store creates its own directory, but not missing parents.
    let path = Path::new(&config.storage.path);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        errors.push(ValidationError::StoragePathInvalid(config.storage.path.clone()));
    }

    for name in &config.plugins.disabled {
        if crate::plugins::is_reserved(name) {
            errors.push(ValidationError::ReservedPlugin(name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_every_problem_is_reported() {
        let toml = r#"
[bot]
prefix = ""
autosave_interval = 0

[storage]
path = "/nonexistent/dir/data"

[plugins]
disabled = ["mathlib"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyPrefix)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroAutosave)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::StoragePathInvalid(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ReservedPlugin(_))));
    }

    #[test]
    fn test_prefix_with_space_fails() {
        let config: Config = toml::from_str("[bot]\nprefix = \"! \"").unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::PrefixWhitespace(_)));
    }
}
