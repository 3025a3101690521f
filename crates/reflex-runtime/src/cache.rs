//! Caching decorator for LLM providers.
//!
//! Grading prompts repeat across runs over the same corpus; caching
//! identical completions avoids paying for the same verdict twice. The
//! cache wraps any provider and is keyed by the full message list plus
//! the model, so two configs targeting different models never collide.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
};

/// Cache key for one completion call.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CompletionKey {
    messages_hash: u64,
    model: String,
}

impl CompletionKey {
    fn new(messages: &[ChatMessage], config: &CompletionConfig) -> Self {
        let mut hasher = DefaultHasher::new();
        for message in messages {
            message.hash(&mut hasher);
        }
        Self {
            messages_hash: hasher.finish(),
            model: config.model.clone(),
        }
    }
}

/// Provider decorator that serves repeated completions from memory.
///
/// Only successful completions are cached; errors always pass through so
/// a transient failure never gets pinned for the TTL.
pub struct CachedProvider {
    inner: Arc<dyn LlmProvider>,
    cache: Cache<CompletionKey, CompletionResponse>,
}

impl CachedProvider {
    /// Wrap a provider with the given cache bounds.
    pub fn new(inner: Arc<dyn LlmProvider>, max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }

    /// Wrap a provider with default bounds: 10k entries, one hour TTL.
    pub fn with_defaults(inner: Arc<dyn LlmProvider>) -> Self {
        Self::new(inner, 10_000, Duration::from_secs(3600))
    }

    /// Number of live cache entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Drop every cached completion.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl LlmProvider for CachedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let key = CompletionKey::new(&messages, config);

        if let Some(cached) = self.cache.get(&key).await {
            tracing::trace!(model = %config.model, "completion cache hit");
            return Ok(cached);
        }

        let response = self.inner.complete(messages, config).await?;
        self.cache.insert(key, response.clone()).await;
        Ok(response)
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
