//! Routing predicates: the pure decision half of the state machine.
//!
//! These rules are the policy of the loop and are not configurable:
//!
//! 1. No relevant evidence -> rewrite the query, never generate from nothing
//! 2. Ungrounded answer -> regenerate from the same evidence, never re-retrieve
//! 3. Grounded but unhelpful answer -> rewrite the query and start over
//!
//! The runtime engine performs the side effects; everything here is a pure
//! function of grades and state, so the transition table is testable without
//! a single collaborator.

use crate::types::{
    EvidenceChunk, GroundednessGrade, Node, RelevanceGrade, UsefulnessGrade,
};

/// Keep exactly the chunks graded relevant, preserving retrieval order.
///
/// `grades` pairs positionally with `chunks`; grading each chunk is
/// stateless, so the result depends only on the per-chunk verdicts. Returns
/// an order-preserving subsequence of the input.
///
/// # Panics
///
/// Panics if the lengths differ. That means the caller dropped or
/// duplicated a grade, which is a bug, not an input condition.
pub fn filter_relevant(
    chunks: Vec<EvidenceChunk>,
    grades: &[RelevanceGrade],
) -> Vec<EvidenceChunk> {
    assert_eq!(
        chunks.len(),
        grades.len(),
        "one relevance grade per retrieved chunk"
    );

    chunks
        .into_iter()
        .zip(grades)
        .filter(|(_, grade)| **grade == RelevanceGrade::Relevant)
        .map(|(chunk, _)| chunk)
        .collect()
}

/// After relevance filtering: generate, or go back for better evidence?
///
/// Generating from zero evidence degenerates to unsupported hallucination,
/// so an empty filtered set routes to the rewriter. A retrieval that came
/// back non-empty but filtered to nothing is treated identically to an
/// empty retrieval.
pub fn decide_to_generate(documents: &[EvidenceChunk]) -> Node {
    if documents.is_empty() {
        tracing::debug!("no relevant evidence, routing to transform_query");
        Node::TransformQuery
    } else {
        tracing::debug!(count = documents.len(), "relevant evidence found, routing to generate");
        Node::Generate
    }
}

/// After the groundedness check.
///
/// `NotSupported` re-enters generation with the question and documents
/// untouched: the grader concluded the answer, not the evidence, was at
/// fault, so the evidence set is presumed adequate and is never discarded
/// on this edge.
pub fn route_groundedness(grade: GroundednessGrade) -> Node {
    match grade {
        GroundednessGrade::Supported => Node::GradeUsefulness,
        GroundednessGrade::NotSupported => Node::Generate,
    }
}

/// After the usefulness check. `None` means the run is complete and the
/// current generation is the answer.
///
/// `NotUseful` means the answer was grounded but answered the wrong
/// question, so the only productive move is a query rewrite and a fresh
/// retrieval, never a direct regenerate.
pub fn route_usefulness(grade: UsefulnessGrade) -> Option<Node> {
    match grade {
        UsefulnessGrade::Useful => None,
        UsefulnessGrade::NotUseful => Some(Node::TransformQuery),
    }
}
