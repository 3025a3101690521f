//! Provider factory pattern for config-driven provider construction.
//!
//! New providers register a factory; nothing else in the workspace needs
//! to change to support another vendor.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{LlmProvider, ProviderError};

/// Factory for creating LLM providers from configuration.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, e.g. "anthropic", "openai".
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance from JSON configuration.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Validate configuration without creating a provider. Used for fast
    /// startup checks (`reflex check`).
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;

    /// Sensible defaults for optional fields.
    fn default_config(&self) -> JsonValue {
        serde_json::json!({})
    }
}

/// Registry of available provider factories, keyed by type name.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory, replacing any existing one of the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Create a provider from type name and configuration.
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.factories
            .get(provider_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!(
                    "unknown provider type '{}', available: {:?}",
                    provider_type,
                    self.available_types()
                ))
            })?
            .create(config)
    }

    /// Validate configuration for a provider type.
    pub fn validate(&self, provider_type: &str, config: &JsonValue) -> Result<(), ProviderError> {
        self.factories
            .get(provider_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("unknown provider type '{}'", provider_type))
            })?
            .validate_config(config)
    }

    /// List registered provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Whether a provider type is registered.
    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    /// Registry with all built-in providers registered.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "anthropic")]
        registry.register(Arc::new(super::AnthropicProviderFactory));

        #[cfg(feature = "openai")]
        registry.register(Arc::new(super::OpenAiProviderFactory));

        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatMessage, CompletionConfig, CompletionResponse, TokenUsage};
    use async_trait::async_trait;

    struct FixedProvider {
        name: String,
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                content: "fixed".to_string(),
                usage: TokenUsage::default(),
                model: "fixed".to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct FixedProviderFactory;

    impl ProviderFactory for FixedProviderFactory {
        fn provider_type(&self) -> &'static str {
            "fixed"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            let name = config["name"].as_str().unwrap_or("fixed").to_string();
            Ok(Arc::new(FixedProvider { name }))
        }

        fn validate_config(&self, _config: &JsonValue) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FixedProviderFactory));

        assert!(registry.has_provider("fixed"));
        let provider = registry
            .create("fixed", &serde_json::json!({"name": "p1"}))
            .unwrap();
        assert_eq!(provider.name(), "p1");
    }

    #[test]
    fn test_unknown_provider_type() {
        let registry = ProviderRegistry::new();
        let result = registry.create("nope", &serde_json::json!({}));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_validate_routes_to_factory() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FixedProviderFactory));

        assert!(registry.validate("fixed", &serde_json::json!({})).is_ok());
        assert!(registry.validate("nope", &serde_json::json!({})).is_err());
    }
}
