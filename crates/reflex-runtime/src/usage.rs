//! Accumulated LLM usage for a run.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::providers::TokenUsage;

/// Token and call totals accumulated across every model call in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    /// Total tokens used.
    pub total_tokens: u32,

    /// Prompt/input tokens.
    pub prompt_tokens: u32,

    /// Completion/output tokens.
    pub completion_tokens: u32,

    /// Number of model calls made.
    pub llm_calls: u32,
}

impl LlmUsage {
    /// Fold in the usage from one completion.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens += usage.total();
        self.llm_calls += 1;
    }
}

/// Shared usage meter.
///
/// Every LLM-backed capability holds a clone and records after each call;
/// the engine snapshots the totals into the run result. Relevance grading
/// fans out concurrently, hence the lock rather than plain counters.
#[derive(Clone, Default)]
pub struct UsageMeter {
    usage: Arc<RwLock<LlmUsage>>,
}

impl UsageMeter {
    /// Create a meter with zeroed totals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage from one completion.
    pub fn record(&self, usage: &TokenUsage) {
        self.usage.write().add(usage);
    }

    /// Snapshot the totals so far.
    pub fn snapshot(&self) -> LlmUsage {
        self.usage.read().clone()
    }
}
