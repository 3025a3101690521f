//! The mutable record threaded through one answer attempt.
//!
//! Exactly one `RunState` exists per run; it is never shared across
//! concurrent questions. The fields are private so the write rules hold by
//! construction:
//!
//! - `documents` is replaced wholesale, never appended to
//! - recording a new generation clears both grades
//! - grades refer to the most recent generation or they do not exist

use crate::types::{
    EvidenceChunk, GroundednessGrade, StateError, UsefulnessGrade,
};

/// Working state of a single run.
#[derive(Debug, Clone)]
pub struct RunState {
    question: String,
    documents: Vec<EvidenceChunk>,
    generation: Option<String>,
    groundedness: Option<GroundednessGrade>,
    usefulness: Option<UsefulnessGrade>,
}

impl RunState {
    /// Create the state for a new run.
    ///
    /// The question is trimmed; an empty question is rejected because every
    /// downstream node assumes there is something to retrieve for.
    pub fn new(question: impl Into<String>) -> Result<Self, StateError> {
        let question = question.into().trim().to_string();
        if question.is_empty() {
            return Err(StateError::EmptyQuestion);
        }

        Ok(Self {
            question,
            documents: Vec::new(),
            generation: None,
            groundedness: None,
            usefulness: None,
        })
    }

    /// The current working question.
    pub fn question(&self) -> &str {
        &self.question
    }

    /// The current working evidence set.
    pub fn documents(&self) -> &[EvidenceChunk] {
        &self.documents
    }

    /// The most recent candidate answer, if one has been generated.
    pub fn generation(&self) -> Option<&str> {
        self.generation.as_deref()
    }

    /// Groundedness verdict for the current generation. `None` until the
    /// grader has run against the latest generation.
    pub fn groundedness(&self) -> Option<GroundednessGrade> {
        self.groundedness
    }

    /// Usefulness verdict for the current generation. Same freshness rule
    /// as [`groundedness`](Self::groundedness).
    pub fn usefulness(&self) -> Option<UsefulnessGrade> {
        self.usefulness
    }

    /// Replace the evidence set wholesale.
    ///
    /// Used after retrieval and after relevance filtering. Evidence from a
    /// prior retrieval never survives this call, so a query rewrite followed
    /// by a fresh retrieval cannot leak stale chunks.
    pub fn replace_documents(&mut self, documents: Vec<EvidenceChunk>) {
        self.documents = documents;
    }

    /// Overwrite the working question with the rewriter's output.
    ///
    /// The rewriter contract guarantees a non-empty question; the caller
    /// enforces that before reaching this point.
    pub fn rewrite_question(&mut self, question: String) {
        debug_assert!(!question.trim().is_empty());
        self.question = question;
    }

    /// Record a new candidate answer.
    ///
    /// Both grades are cleared: a grade is only meaningful for the
    /// generation it was computed against.
    pub fn set_generation(&mut self, generation: String) {
        self.generation = Some(generation);
        self.groundedness = None;
        self.usefulness = None;
    }

    /// Record the groundedness verdict for the current generation.
    pub fn record_groundedness(&mut self, grade: GroundednessGrade) {
        self.groundedness = Some(grade);
    }

    /// Record the usefulness verdict for the current generation.
    pub fn record_usefulness(&mut self, grade: UsefulnessGrade) {
        self.usefulness = Some(grade);
    }

    /// Take the generation out of the state, for degraded reporting when a
    /// run fails to converge.
    pub fn into_generation(self) -> Option<String> {
        self.generation
    }
}
