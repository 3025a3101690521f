//! Core data types for a self-reflective RAG run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// An immutable unit of retrieved text.
///
/// The content is what graders and the generator see; the metadata is
/// whatever the retrieval backend attached (source URL, title, score) and
/// passes through the run unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    /// Retrieved text considered as candidate support for an answer.
    pub content: String,

    /// Opaque source metadata, passed through unchanged.
    #[serde(default)]
    pub metadata: JsonValue,
}

impl EvidenceChunk {
    /// Create a chunk from bare text with empty metadata.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: JsonValue::Null,
        }
    }

    /// Create a chunk with source metadata.
    pub fn with_metadata(content: impl Into<String>, metadata: JsonValue) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// Verdict on whether a single chunk bears on the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceGrade {
    Relevant,
    Irrelevant,
}

/// Verdict on whether a generation's claims are supported by the evidence
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundednessGrade {
    Supported,
    NotSupported,
}

/// Verdict on whether a generation resolves the question asked,
/// independent of groundedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsefulnessGrade {
    Useful,
    NotUseful,
}

/// A named state of the control-flow machine.
///
/// The run always starts at `Retrieve`. There is no explicit terminal
/// variant: the usefulness routing predicate signals completion by
/// returning no next node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Fetch candidate evidence for the current question.
    Retrieve,
    /// Filter the retrieved chunks down to the relevant ones.
    GradeDocuments,
    /// Rewrite the question and loop back to retrieval.
    TransformQuery,
    /// Produce a candidate answer from the filtered evidence.
    Generate,
    /// Check the answer against the evidence that produced it.
    GradeGroundedness,
    /// Check the answer against the original question.
    GradeUsefulness,
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Node::Retrieve => "retrieve",
            Node::GradeDocuments => "grade_documents",
            Node::TransformQuery => "transform_query",
            Node::Generate => "generate",
            Node::GradeGroundedness => "grade_groundedness",
            Node::GradeUsefulness => "grade_usefulness",
        };
        write!(f, "{}", name)
    }
}

/// Summary of a completed run, returned at the terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// The accepted answer (groundedness and usefulness both passed).
    pub answer: String,

    /// The working question at completion. Differs from the input question
    /// if the rewriter ran.
    pub question: String,

    /// Number of node executions the run consumed.
    pub transitions: u32,

    /// When the run reached the terminal state.
    pub finished_at: DateTime<Utc>,
}

/// Error constructing a run from caller input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("question must not be empty")]
    EmptyQuestion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_constructors() {
        let plain = EvidenceChunk::text("water boils at 100C");
        assert_eq!(plain.metadata, JsonValue::Null);

        let tagged = EvidenceChunk::with_metadata(
            "water boils at 100C",
            serde_json::json!({"source": "physics.md"}),
        );
        assert_eq!(tagged.metadata["source"], "physics.md");
        assert_eq!(plain.content, tagged.content);
    }

    #[test]
    fn test_grade_serde_labels() {
        assert_eq!(
            serde_json::to_string(&GroundednessGrade::NotSupported).unwrap(),
            "\"not_supported\""
        );
        assert_eq!(
            serde_json::from_str::<UsefulnessGrade>("\"useful\"").unwrap(),
            UsefulnessGrade::Useful
        );
    }

    #[test]
    fn test_node_display_names() {
        assert_eq!(Node::Retrieve.to_string(), "retrieve");
        assert_eq!(Node::GradeGroundedness.to_string(), "grade_groundedness");
    }
}
