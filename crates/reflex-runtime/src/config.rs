//! Engine configuration.
//!
//! Loaded from YAML; every field has a default so an empty file (or no
//! file) yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use reflex_core::budget::DEFAULT_MAX_TRANSITIONS;

use crate::providers::CompletionConfig;

/// Configuration for one engine instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on state transitions per run.
    pub max_transitions: u32,

    /// Timeout applied to each capability call.
    #[serde(with = "humantime_serde_compat")]
    pub call_timeout: Duration,

    /// Completion settings for the answer generator.
    pub generator: CompletionConfig,

    /// Completion settings for the graders and the query rewriter.
    pub grader: CompletionConfig,

    /// Cache completions across calls.
    pub cache_completions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_transitions: DEFAULT_MAX_TRANSITIONS,
            call_timeout: Duration::from_secs(60),
            generator: CompletionConfig {
                max_tokens: 1024,
                ..Default::default()
            },
            // Verdicts are a few tokens of JSON.
            grader: CompletionConfig {
                max_tokens: 64,
                ..Default::default()
            },
            cache_completions: false,
        }
    }
}

impl EngineConfig {
    /// Parse from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(text).map_err(ConfigError::Parse)
    }

    /// Load from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_yaml(&text)
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_transitions == 0 {
            return Err(ConfigError::Invalid(
                "max_transitions must be at least 1".to_string(),
            ));
        }
        if self.call_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "call_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

mod humantime_serde_compat {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&humantime::format_duration(*d).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(d)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_transitions, DEFAULT_MAX_TRANSITIONS);
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config.max_transitions, EngineConfig::default().max_transitions);
        assert_eq!(config.grader.max_tokens, 64);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
max_transitions: 8
call_timeout: 10s
generator:
  model: claude-sonnet-4-5
  max_tokens: 512
  temperature: 0.2
  timeout: 20s
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_transitions, 8);
        assert_eq!(config.call_timeout, Duration::from_secs(10));
        assert_eq!(config.generator.model, "claude-sonnet-4-5");
        assert_eq!(config.grader.max_tokens, 64);
    }

    #[test]
    fn test_zero_transitions_rejected() {
        let config = EngineConfig {
            max_transitions: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
