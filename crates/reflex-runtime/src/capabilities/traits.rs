//! Capability traits and their shared error type.

use async_trait::async_trait;
use reflex_core::{EvidenceChunk, GroundednessGrade, RelevanceGrade, UsefulnessGrade};
use thiserror::Error;

/// Errors a capability may surface to the engine.
///
/// The engine performs no local recovery: a retrieval failure or contract
/// violation aborts the run and is returned to the caller. The only
/// "retries" in the system are the designed loops (regenerate, rewrite),
/// and those are routing decisions, not error handling.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The retrieval backend is unavailable or erroring.
    #[error("retrieval failed: {0}")]
    RetrievalUnavailable(String),

    /// A grader or rewriter produced output outside its declared contract.
    ///
    /// Never mapped to a default verdict: silently coercing an unknown
    /// label would hide a collaborator defect as a domain decision.
    #[error("{capability} violated its contract: got {got:?}, expected one of {expected:?}")]
    ContractViolation {
        capability: &'static str,
        got: String,
        expected: &'static [&'static str],
    },

    /// The underlying model call failed (transport, auth, rate limit).
    #[error("model call failed: {0}")]
    Llm(String),
}

/// Fetches candidate evidence for a query.
///
/// Ordering of the result is owned by the retriever; the engine performs
/// no dedup or re-ranking. The backing index is read-only for the duration
/// of a run.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn fetch(&self, query: &str) -> Result<Vec<EvidenceChunk>, CapabilityError>;
}

/// Classifies whether a single chunk bears on the question.
///
/// Grading is stateless: the verdict depends only on the (question, chunk)
/// pair, never on other chunks, so the engine is free to grade chunks
/// concurrently.
#[async_trait]
pub trait RelevanceGrader: Send + Sync {
    async fn grade(
        &self,
        question: &str,
        chunk_content: &str,
    ) -> Result<RelevanceGrade, CapabilityError>;
}

/// Produces a candidate answer from the question and formatted evidence.
///
/// An empty string is a valid (if poor) generation; the downstream checks
/// decide its fate.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        question: &str,
        evidence_text: &str,
    ) -> Result<String, CapabilityError>;
}

/// Classifies whether a generation's claims are supported by the evidence
/// that produced it.
#[async_trait]
pub trait GroundednessGrader: Send + Sync {
    async fn grade(
        &self,
        evidence_text: &str,
        generation: &str,
    ) -> Result<GroundednessGrade, CapabilityError>;
}

/// Classifies whether a generation resolves the question asked.
#[async_trait]
pub trait UsefulnessGrader: Send + Sync {
    async fn grade(
        &self,
        question: &str,
        generation: &str,
    ) -> Result<UsefulnessGrade, CapabilityError>;
}

/// Produces a semantically improved question after a failed evidence pass.
///
/// Must return a non-empty string; an empty rewrite is a contract
/// violation, since the next retrieval would be meaningless.
#[async_trait]
pub trait QueryRewriter: Send + Sync {
    async fn rewrite(&self, question: &str) -> Result<String, CapabilityError>;
}
