//! LLM-backed graders.
//!
//! Graders produce verdicts, and only verdicts: a single JSON object with
//! a yes/no label. Prose or an unknown label out of the model is a
//! contract violation that fails the run. We never best-effort a verdict
//! out of malformed output.

use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;

use reflex_core::{GroundednessGrade, RelevanceGrade, UsefulnessGrade};

use crate::capabilities::{
    CapabilityError, GroundednessGrader, RelevanceGrader, UsefulnessGrader,
};
use crate::prompts;
use crate::providers::{ChatMessage, CompletionConfig, LlmProvider};
use crate::usage::UsageMeter;

const BINARY_LABELS: &[&str] = &["yes", "no"];

lazy_static! {
    /// First JSON object in the model output. Tolerates surrounding prose
    /// and markdown fences; does not tolerate a missing object.
    static ref JSON_OBJECT: Regex = Regex::new(r"\{[^{}]*\}").expect("invalid regex");
}

#[derive(Debug, Deserialize)]
struct BinaryScore {
    binary_score: String,
}

/// Extract the yes/no verdict from raw model output.
///
/// Strict by policy: a verdict is either recognizably `yes` or `no`, or
/// the grader has violated its contract.
fn parse_binary_verdict(raw: &str, capability: &'static str) -> Result<bool, CapabilityError> {
    let violation = |got: &str| CapabilityError::ContractViolation {
        capability,
        got: got.chars().take(120).collect(),
        expected: BINARY_LABELS,
    };

    let object = JSON_OBJECT
        .find(raw)
        .ok_or_else(|| violation(raw.trim()))?;

    let score: BinaryScore =
        serde_json::from_str(object.as_str()).map_err(|_| violation(object.as_str()))?;

    match score.binary_score.trim().to_lowercase().as_str() {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(violation(other)),
    }
}

/// Shared plumbing for one grading call.
async fn graded_completion(
    provider: &Arc<dyn LlmProvider>,
    config: &CompletionConfig,
    meter: &UsageMeter,
    system: &str,
    user: String,
    capability: &'static str,
) -> Result<bool, CapabilityError> {
    let messages = vec![ChatMessage::system(system), ChatMessage::user(user)];

    let response = provider
        .complete(messages, config)
        .await
        .map_err(|e| CapabilityError::Llm(e.to_string()))?;
    meter.record(&response.usage);

    let verdict = parse_binary_verdict(&response.content, capability)?;
    tracing::debug!(capability, verdict, "grader verdict");
    Ok(verdict)
}

/// Relevance grader backed by an LLM provider.
pub struct LlmRelevanceGrader {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    meter: UsageMeter,
}

impl LlmRelevanceGrader {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig, meter: UsageMeter) -> Self {
        Self {
            provider,
            config,
            meter,
        }
    }
}

#[async_trait]
impl RelevanceGrader for LlmRelevanceGrader {
    async fn grade(
        &self,
        question: &str,
        chunk_content: &str,
    ) -> Result<RelevanceGrade, CapabilityError> {
        let relevant = graded_completion(
            &self.provider,
            &self.config,
            &self.meter,
            prompts::RELEVANCE_GRADER_PROMPT,
            prompts::relevance_user_prompt(question, chunk_content),
            "relevance grader",
        )
        .await?;

        Ok(if relevant {
            RelevanceGrade::Relevant
        } else {
            RelevanceGrade::Irrelevant
        })
    }
}

/// Groundedness grader backed by an LLM provider.
pub struct LlmGroundednessGrader {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    meter: UsageMeter,
}

impl LlmGroundednessGrader {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig, meter: UsageMeter) -> Self {
        Self {
            provider,
            config,
            meter,
        }
    }
}

#[async_trait]
impl GroundednessGrader for LlmGroundednessGrader {
    async fn grade(
        &self,
        evidence_text: &str,
        generation: &str,
    ) -> Result<GroundednessGrade, CapabilityError> {
        let supported = graded_completion(
            &self.provider,
            &self.config,
            &self.meter,
            prompts::GROUNDEDNESS_GRADER_PROMPT,
            prompts::groundedness_user_prompt(evidence_text, generation),
            "groundedness grader",
        )
        .await?;

        Ok(if supported {
            GroundednessGrade::Supported
        } else {
            GroundednessGrade::NotSupported
        })
    }
}

/// Usefulness grader backed by an LLM provider.
pub struct LlmUsefulnessGrader {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    meter: UsageMeter,
}

impl LlmUsefulnessGrader {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig, meter: UsageMeter) -> Self {
        Self {
            provider,
            config,
            meter,
        }
    }
}

#[async_trait]
impl UsefulnessGrader for LlmUsefulnessGrader {
    async fn grade(
        &self,
        question: &str,
        generation: &str,
    ) -> Result<UsefulnessGrade, CapabilityError> {
        let useful = graded_completion(
            &self.provider,
            &self.config,
            &self.meter,
            prompts::USEFULNESS_GRADER_PROMPT,
            prompts::usefulness_user_prompt(question, generation),
            "usefulness grader",
        )
        .await?;

        Ok(if useful {
            UsefulnessGrade::Useful
        } else {
            UsefulnessGrade::NotUseful
        })
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
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                },
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

    fn grader_with(content: &str) -> (LlmRelevanceGrader, UsageMeter) {
        let meter = UsageMeter::new();
        let grader = LlmRelevanceGrader::new(
            Arc::new(CannedProvider {
                content: content.to_string(),
            }),
            CompletionConfig::default(),
            meter.clone(),
        );
        (grader, meter)
    }

    #[test]
    fn test_parse_plain_verdicts() {
        assert!(parse_binary_verdict(r#"{"binary_score": "yes"}"#, "t").unwrap());
        assert!(!parse_binary_verdict(r#"{"binary_score": "no"}"#, "t").unwrap());
    }

    #[test]
    fn test_parse_tolerates_fences_and_case() {
        let fenced = "```json\n{\"binary_score\": \"Yes\"}\n```";
        assert!(parse_binary_verdict(fenced, "t").unwrap());
    }

    #[test]
    fn test_unknown_label_is_contract_violation() {
        let result = parse_binary_verdict(r#"{"binary_score": "maybe"}"#, "t");
        match result {
            Err(CapabilityError::ContractViolation { got, expected, .. }) => {
                assert_eq!(got, "maybe");
                assert_eq!(expected, BINARY_LABELS);
            }
            other => panic!("expected contract violation, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_prose_without_json_is_contract_violation() {
        let result = parse_binary_verdict("The document seems relevant to me.", "t");
        assert!(matches!(
            result,
            Err(CapabilityError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_wrong_json_shape_is_contract_violation() {
        let result = parse_binary_verdict(r#"{"verdict": "yes"}"#, "t");
        assert!(matches!(
            result,
            Err(CapabilityError::ContractViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_relevance_grader_maps_labels_and_records_usage() {
        let (grader, meter) = grader_with(r#"{"binary_score": "no"}"#);
        let grade = grader.grade("q", "chunk").await.unwrap();

        assert_eq!(grade, RelevanceGrade::Irrelevant);
        assert_eq!(meter.snapshot().llm_calls, 1);
        assert_eq!(meter.snapshot().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_groundedness_grader_maps_labels() {
        let meter = UsageMeter::new();
        let grader = LlmGroundednessGrader::new(
            Arc::new(CannedProvider {
                content: r#"{"binary_score": "yes"}"#.to_string(),
            }),
            CompletionConfig::default(),
            meter,
        );

        let grade = grader.grade("evidence", "answer").await.unwrap();
        assert_eq!(grade, GroundednessGrade::Supported);
    }

    #[tokio::test]
    async fn test_usefulness_grader_rejects_garbage() {
        let meter = UsageMeter::new();
        let grader = LlmUsefulnessGrader::new(
            Arc::new(CannedProvider {
                content: "hard to say".to_string(),
            }),
            CompletionConfig::default(),
            meter,
        );

        let result = grader.grade("q", "answer").await;
        assert!(matches!(
            result,
            Err(CapabilityError::ContractViolation { .. })
        ));
    }
}
