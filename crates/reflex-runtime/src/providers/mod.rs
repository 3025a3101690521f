//! LLM provider abstractions.
//!
//! Every LLM-backed capability (graders, generator, rewriter) talks to a
//! model through [`LlmProvider`]. This is the only module that knows about
//! HTTP or vendors; swapping providers never touches the engine.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling. See
//! [`ApiCredential`] for the patterns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

#[cfg(feature = "openai")]
mod openai;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, AnthropicProviderFactory};

#[cfg(feature = "openai")]
pub use openai::{OpenAiProvider, OpenAiProviderFactory};

/// Errors from LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Configuration for a completion request.
///
/// Graders run at temperature 0 with a tight token cap (the verdict is a
/// few tokens of JSON); the generator gets room to write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Model to use.
    pub model: String,

    /// Maximum tokens to generate.
    pub max_tokens: u32,

    /// Temperature (0.0 for deterministic).
    pub temperature: f32,

    /// Request timeout.
    #[serde(with = "humantime_serde_compat")]
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 256,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

/// serde adapter so configs can write `timeout: 30s`.
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

/// A chat message for LLM completion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role: "system", "user", or "assistant".
    pub role: String,

    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response from an LLM completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated content.
    pub content: String,

    /// Token usage.
    pub usage: TokenUsage,

    /// Model that served the request.
    pub model: String,
}

/// Token usage from a completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,

    /// Tokens in the completion.
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Provider abstraction allows swapping LLM backends.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a chat completion.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Check if the provider is usable (credentials present, etc.).
    async fn health_check(&self) -> bool;

    /// Provider name for logs and metrics.
    fn name(&self) -> &str;

    /// Rough token estimate for a prompt (~4 chars per token).
    fn estimate_tokens(&self, text: &str) -> u32 {
        (text.len() / 4) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullProvider;

    #[async_trait]
    impl LlmProvider for NullProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            Err(ProviderError::NotConfigured("null".to_string()))
        }

        async fn health_check(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "null"
        }
    }

    #[test]
    fn test_estimate_tokens_default() {
        assert_eq!(NullProvider.estimate_tokens(""), 0);
        assert_eq!(NullProvider.estimate_tokens("abcdefgh"), 2);
        // Rounds down: partial chunks do not count.
        assert_eq!(NullProvider.estimate_tokens("abcdefghij"), 2);
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("be terse").role, "system");
        assert_eq!(ChatMessage::user("hi").role, "user");
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 120,
            completion_tokens: 30,
        };
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_completion_config_timeout_roundtrip() {
        let config = CompletionConfig {
            timeout: Duration::from_secs(45),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("45s"));

        let back: CompletionConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.timeout, Duration::from_secs(45));
    }
}
