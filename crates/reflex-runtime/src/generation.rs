//! LLM-backed answer generator and query rewriter.

use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;

use crate::capabilities::{CapabilityError, Generator, QueryRewriter};
use crate::prompts;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::usage::UsageMeter;

lazy_static! {
    /// Markdown code fences some models wrap short outputs in.
    static ref CODE_FENCE: Regex = Regex::new(r"```[a-zA-Z]*\n?|```").expect("invalid regex");
}

/// Answer generator backed by an LLM provider.
///
/// An empty completion is passed through as-is: it is a valid (if poor)
/// generation and the downstream graders will dispose of it.
pub struct LlmGenerator {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    meter: UsageMeter,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig, meter: UsageMeter) -> Self {
        Self {
            provider,
            config,
            meter,
        }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(
        &self,
        question: &str,
        evidence_text: &str,
    ) -> Result<String, CapabilityError> {
        let messages = vec![
            ChatMessage::system(prompts::GENERATOR_PROMPT),
            ChatMessage::user(prompts::generation_user_prompt(question, evidence_text)),
        ];

        tracing::debug!(
            evidence_tokens = self.provider.estimate_tokens(evidence_text),
            "generating answer"
        );

        let response = self
            .provider
            .complete(messages, &self.config)
            .await
            .map_err(|e| CapabilityError::Llm(e.to_string()))?;
        self.meter.record(&response.usage);

        Ok(response.content.trim().to_string())
    }
}

/// Query rewriter backed by an LLM provider.
pub struct LlmQueryRewriter {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    meter: UsageMeter,
}

impl LlmQueryRewriter {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig, meter: UsageMeter) -> Self {
        Self {
            provider,
            config,
            meter,
        }
    }
}

/// Strip the decoration models add around a rewritten question: fences,
/// wrapping quotes, stray blank lines.
fn sanitize_rewrite(raw: &str) -> String {
    let no_fences = CODE_FENCE.replace_all(raw, "");
    no_fences
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

#[async_trait]
impl QueryRewriter for LlmQueryRewriter {
    async fn rewrite(&self, question: &str) -> Result<String, CapabilityError> {
        let messages = vec![
            ChatMessage::system(prompts::QUERY_REWRITER_PROMPT),
            ChatMessage::user(prompts::rewrite_user_prompt(question)),
        ];

        let response = self
            .provider
            .complete(messages, &self.config)
            .await
            .map_err(|e| CapabilityError::Llm(e.to_string()))?;
        self.meter.record(&response.usage);

        let rewritten = sanitize_rewrite(&response.content);
        if rewritten.is_empty() {
            return Err(CapabilityError::ContractViolation {
                capability: "query rewriter",
                got: response.content.chars().take(120).collect(),
                expected: &["a non-empty question"],
            });
        }

        tracing::debug!(from = question, to = %rewritten, "query rewritten");
        Ok(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{CompletionResponse, ProviderError, TokenUsage};

    struct CannedProvider {
        content: String,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(
            &self,
            _messages: Vec<ChatMessage>,
            _config: &CompletionConfig,
        ) -> Result<CompletionResponse, ProviderError> {
            Ok(CompletionResponse {
                content: self.content.clone(),
                usage: TokenUsage::default(),
                model: "canned".to_string(),
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    fn rewriter_with(content: &str) -> LlmQueryRewriter {
        LlmQueryRewriter::new(
            Arc::new(CannedProvider {
                content: content.to_string(),
            }),
            CompletionConfig::default(),
            UsageMeter::new(),
        )
    }

    #[test]
    fn test_sanitize_strips_fences_and_quotes() {
        assert_eq!(
            sanitize_rewrite("```\n\"organic milk brands\"\n```"),
            "organic milk brands"
        );
        assert_eq!(sanitize_rewrite("  plain question  "), "plain question");
    }

    #[tokio::test]
    async fn test_rewriter_returns_sanitized_question() {
        let rewriter = rewriter_with("\"boiling point of water at altitude\"\n");
        let rewritten = rewriter.rewrite("how hot before water boils up high?").await.unwrap();
        assert_eq!(rewritten, "boiling point of water at altitude");
    }

    #[tokio::test]
    async fn test_empty_rewrite_is_contract_violation() {
        let rewriter = rewriter_with("``` ```");
        let result = rewriter.rewrite("anything").await;
        assert!(matches!(
            result,
            Err(CapabilityError::ContractViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_generator_passes_empty_completion_through() {
        let generator = LlmGenerator::new(
            Arc::new(CannedProvider {
                content: "   ".to_string(),
            }),
            CompletionConfig::default(),
            UsageMeter::new(),
        );

        let generation = generator.generate("q", "evidence").await.unwrap();
        assert_eq!(generation, "");
    }
}
