//! # reflex-core
//!
//! Deterministic control-flow core for self-reflective RAG runs.
//!
//! A run retrieves evidence for a question, filters it for relevance,
//! generates an answer, and then asks two independent questions about the
//! answer: is it grounded in the evidence, and does it address the
//! question? Failing either check loops back: regenerate for a grounding
//! failure, rewrite-and-re-retrieve for a usefulness failure.
//!
//! This crate holds the parts of that loop that are pure:
//!
//! - the run state and its write rules ([`RunState`])
//! - the grade and node vocabulary ([`types`])
//! - the routing predicates that decide every transition ([`routing`])
//! - the step budget that bounds the two repair loops ([`StepBudget`])
//!
//! ## Key guarantees
//!
//! 1. **Deterministic**: routing is a pure function of grades and state
//! 2. **No LLM calls, no I/O**: collaborators live in `reflex-runtime`
//! 3. **Bounded**: every run consumes a finite transition budget
//! 4. **Fresh grades**: a grade can only exist for the generation it was
//!    computed against

pub mod budget;
pub mod routing;
pub mod state;
pub mod types;

pub use budget::{StepBudget, DEFAULT_MAX_TRANSITIONS};
pub use state::RunState;
pub use types::{
    EvidenceChunk, GroundednessGrade, Node, RelevanceGrade, RunReport, StateError,
    UsefulnessGrade,
};

#[cfg(test)]
mod tests {
    use super::*;
    use routing::{decide_to_generate, filter_relevant, route_groundedness, route_usefulness};

    /// Walk the happy path through the pure half of the machine: grades in,
    /// transitions out, terminal implies both checks passed.
    #[test]
    fn test_clean_run_transition_sequence() {
        let mut state = RunState::new("what is the boiling point of water?").unwrap();

        // Retrieve.
        state.replace_documents(vec![
            EvidenceChunk::text("Water boils at 100 degrees Celsius at sea level."),
            EvidenceChunk::text("The mitochondria is the powerhouse of the cell."),
        ]);

        // GradeDocuments: second chunk is off-topic.
        let grades = [RelevanceGrade::Relevant, RelevanceGrade::Irrelevant];
        let filtered = filter_relevant(state.documents().to_vec(), &grades);
        state.replace_documents(filtered);
        assert_eq!(decide_to_generate(state.documents()), Node::Generate);

        // Generate, then both checks pass.
        state.set_generation("Water boils at 100C at sea level.".to_string());
        state.record_groundedness(GroundednessGrade::Supported);
        assert_eq!(
            route_groundedness(state.groundedness().unwrap()),
            Node::GradeUsefulness
        );

        state.record_usefulness(UsefulnessGrade::Useful);
        assert_eq!(route_usefulness(state.usefulness().unwrap()), None);

        // Terminal state: both verdicts are the passing ones.
        assert_eq!(state.groundedness(), Some(GroundednessGrade::Supported));
        assert_eq!(state.usefulness(), Some(UsefulnessGrade::Useful));
    }
}
