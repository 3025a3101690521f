//! File-backed corpus retriever.
//!
//! A small lexical retriever over a JSON corpus file. It exists so the CLI
//! can run the full loop without a vector database; anything smarter plugs
//! in through the [`Retriever`](crate::capabilities::Retriever) trait.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use reflex_core::EvidenceChunk;

use crate::capabilities::{CapabilityError, Retriever};

const DEFAULT_TOP_K: usize = 4;

#[derive(Debug, Deserialize)]
struct CorpusDocument {
    content: String,
    #[serde(default)]
    metadata: serde_json::Value,
}

/// Retriever over an in-memory document list loaded from a JSON file.
///
/// Scoring is case-insensitive query-term overlap. Ties keep corpus order,
/// so retrieval is deterministic for a given corpus and query.
pub struct CorpusRetriever {
    documents: Vec<EvidenceChunk>,
    top_k: usize,
}

impl CorpusRetriever {
    /// Build from documents already in memory.
    pub fn new(documents: Vec<EvidenceChunk>) -> Self {
        Self {
            documents,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Load a corpus from a JSON file holding an array of
    /// `{"content": "...", "metadata": {...}}` objects.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CorpusError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CorpusError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_json(&text)
    }

    /// Parse a corpus from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CorpusError> {
        let documents: Vec<CorpusDocument> =
            serde_json::from_str(text).map_err(CorpusError::Parse)?;
        if documents.is_empty() {
            return Err(CorpusError::Empty);
        }

        let chunks = documents
            .into_iter()
            .map(|d| EvidenceChunk::with_metadata(d.content, d.metadata))
            .collect();

        Ok(Self::new(chunks))
    }

    /// Cap on documents returned per query.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Number of documents in the corpus.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn score(query_terms: &HashSet<String>, content: &str) -> usize {
        let lower = content.to_lowercase();
        query_terms
            .iter()
            .filter(|term| lower.contains(term.as_str()))
            .count()
    }
}

fn query_terms(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Retriever for CorpusRetriever {
    async fn fetch(&self, query: &str) -> Result<Vec<EvidenceChunk>, CapabilityError> {
        let terms = query_terms(query);

        let mut scored: Vec<(usize, usize)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (i, Self::score(&terms, &doc.content)))
            .filter(|(_, score)| *score > 0)
            .collect();

        // Stable sort keeps corpus order among equal scores.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.truncate(self.top_k);

        let hits = scored
            .into_iter()
            .map(|(i, _)| self.documents[i].clone())
            .collect::<Vec<_>>();

        tracing::debug!(query, hits = hits.len(), "corpus retrieval");
        Ok(hits)
    }
}

/// Errors loading a corpus file.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus file {0}: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("failed to parse corpus: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("corpus holds no documents")]
    Empty,
}
