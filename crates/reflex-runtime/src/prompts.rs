//! System prompts for the LLM-backed capabilities.
//!
//! The three graders share one output contract: a single JSON object
//! `{"binary_score": "yes"|"no"}` and nothing else. Parsing is strict; a
//! grader that answers outside this contract fails the run rather than
//! being coerced to a verdict.

use reflex_core::EvidenceChunk;

/// Relevance grader: does this one chunk bear on the question?
pub const RELEVANCE_GRADER_PROMPT: &str = r#"
You are a grader assessing whether a retrieved document is relevant to a
user's question.

Consider the document relevant if it:
- contains information that addresses the question directly
- covers the same subject, entity, or event the question asks about
- could reasonably serve as partial support for an answer

A document is not irrelevant merely because it is incomplete. It is
irrelevant if it concerns a different subject entirely.

Respond with a single JSON object and nothing else:
{"binary_score": "yes"} if the document is relevant
{"binary_score": "no"} if it is not
"#;

/// Groundedness grader: is the answer supported by the evidence?
pub const GROUNDEDNESS_GRADER_PROMPT: &str = r#"
You are a grader assessing whether an answer is grounded in a set of
retrieved documents.

The answer is grounded only if:
- every factual claim it makes appears in or follows from the documents
- it does not invent entities, numbers, or details absent from the documents
- it does not contradict the documents

Stylistic rephrasing is fine; new facts are not.

Respond with a single JSON object and nothing else:
{"binary_score": "yes"} if the answer is grounded in the documents
{"binary_score": "no"} if it is not
"#;

/// Usefulness grader: does the answer resolve the question asked?
pub const USEFULNESS_GRADER_PROMPT: &str = r#"
You are a grader assessing whether an answer resolves a user's question.
Ignore whether the answer is true; another check handles that. Judge only
whether it addresses what was asked.

The answer is useful if:
- it speaks to the thing the question actually asks about
- a reader with that question would consider it an answer, not a deflection

Respond with a single JSON object and nothing else:
{"binary_score": "yes"} if the answer addresses the question
{"binary_score": "no"} if it does not
"#;

/// Answer generator system prompt.
pub const GENERATOR_PROMPT: &str = r#"
You are an assistant answering questions from retrieved documents.

- Base the answer only on the documents provided
- Do not mention documents, retrieval, or context; just state the facts
- If the documents suggest but do not confirm something, say so plainly
- Keep the answer concise and factual
"#;

/// Query rewriter system prompt.
pub const QUERY_REWRITER_PROMPT: &str = r#"
The question below failed to retrieve useful documents. Rewrite it into a
better retrieval query.

- Keep the underlying intent; sharpen the wording
- Prefer concrete nouns and key terms over full conversational sentences
- Output only the rewritten question, with no preamble and no quotes
"#;

/// Render an evidence set the way the generator and the groundedness
/// grader see it: numbered document blocks with a separator.
pub fn format_evidence(chunks: &[EvidenceChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[Document {}]\n{}", i + 1, chunk.content))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// User prompt for one relevance grading call.
pub fn relevance_user_prompt(question: &str, chunk_content: &str) -> String {
    format!(
        "Document:\n{}\n\nQuestion: {}",
        chunk_content, question
    )
}

/// User prompt for one groundedness grading call.
pub fn groundedness_user_prompt(evidence_text: &str, generation: &str) -> String {
    format!(
        "Documents:\n{}\n\nAnswer:\n{}",
        evidence_text, generation
    )
}

/// User prompt for one usefulness grading call.
pub fn usefulness_user_prompt(question: &str, generation: &str) -> String {
    format!(
        "Question: {}\n\nAnswer:\n{}",
        question, generation
    )
}

/// User prompt for one generation call.
pub fn generation_user_prompt(question: &str, evidence_text: &str) -> String {
    format!(
        "Question: {}\n\nDocuments:\n{}",
        question, evidence_text
    )
}

/// User prompt for one rewrite call.
pub fn rewrite_user_prompt(question: &str) -> String {
    format!("Original question: {}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grader_prompts_state_the_output_contract() {
        for prompt in [
            RELEVANCE_GRADER_PROMPT,
            GROUNDEDNESS_GRADER_PROMPT,
            USEFULNESS_GRADER_PROMPT,
        ] {
            assert!(prompt.contains(r#"{"binary_score": "yes"}"#));
            assert!(prompt.contains(r#"{"binary_score": "no"}"#));
        }
    }

    #[test]
    fn test_usefulness_is_independent_of_truth() {
        assert!(USEFULNESS_GRADER_PROMPT.contains("Ignore whether the answer is true"));
    }

    #[test]
    fn test_rewriter_demands_bare_output() {
        assert!(QUERY_REWRITER_PROMPT.contains("no preamble"));
    }

    #[test]
    fn test_format_evidence_numbers_documents() {
        let chunks = vec![
            EvidenceChunk::text("first fact"),
            EvidenceChunk::text("second fact"),
        ];
        let text = format_evidence(&chunks);

        assert!(text.contains("[Document 1]\nfirst fact"));
        assert!(text.contains("[Document 2]\nsecond fact"));
        assert!(text.contains("---"));
    }

    #[test]
    fn test_format_evidence_empty_is_empty() {
        assert_eq!(format_evidence(&[]), "");
    }
}
