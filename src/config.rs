//! Editor configuration loaded from YAML.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings shared by the story editor, response engine and activity feed.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    /// Language used for new response variants.
    pub default_language: String,
    /// Prefix for auto-named responses (`utter_new` -> `utter_new_3`).
    pub new_response_prefix: String,
    /// Reinterpretation stops queueing once this many ids are in flight.
    pub max_pending_reinterpretations: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
            new_response_prefix: "utter_new".to_string(),
            max_pending_reinterpretations: 50,
        }
    }
}

impl EditorConfig {
    /// Parses and validates a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_language.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_language must not be empty".to_string(),
            ));
        }
        if self.new_response_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "new_response_prefix must not be empty".to_string(),
            ));
        }
        if self.max_pending_reinterpretations == 0 {
            return Err(ConfigError::Invalid(
                "max_pending_reinterpretations must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads editor configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<EditorConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    EditorConfig::from_yaml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EditorConfig::from_yaml("default_language: fr\n").unwrap();
        assert_eq!(config.default_language, "fr");
        assert_eq!(config.new_response_prefix, "utter_new");
        assert_eq!(config.max_pending_reinterpretations, 50);
    }

    #[test]
    fn test_rejects_zero_pending_limit() {
        let err = EditorConfig::from_yaml("max_pending_reinterpretations: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_empty_prefix() {
        assert!(EditorConfig::from_yaml("new_response_prefix: ''\n").is_err());
    }
}
