//! # reflex-runtime
//!
//! Async runtime for self-reflective RAG runs.
//!
//! `reflex-core` decides; this crate executes. It provides:
//!
//! - the capability traits the engine is generic over ([`capabilities`])
//! - LLM-backed implementations of the graders, generator, and query
//!   rewriter ([`grading`], [`generation`])
//! - the provider layer that talks to model APIs ([`providers`]), with an
//!   optional caching decorator ([`cache`])
//! - a file-backed lexical retriever for running without a vector store
//!   ([`corpus`])
//! - the engine itself ([`engine`]), which walks the state machine under a
//!   transition budget and per-call timeouts
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use reflex_runtime::config::EngineConfig;
//! use reflex_runtime::corpus::CorpusRetriever;
//! use reflex_runtime::engine::SelfRag;
//! use reflex_runtime::grading::{
//!     LlmGroundednessGrader, LlmRelevanceGrader, LlmUsefulnessGrader,
//! };
//! use reflex_runtime::generation::{LlmGenerator, LlmQueryRewriter};
//! use reflex_runtime::providers::LlmProvider;
//! use reflex_runtime::usage::UsageMeter;
//!
//! # async fn example(provider: Arc<dyn LlmProvider>) -> anyhow::Result<()> {
//! let config = EngineConfig::default();
//! let meter = UsageMeter::new();
//!
//! let engine = SelfRag::builder()
//!     .retriever(Arc::new(CorpusRetriever::from_file("corpus.json")?))
//!     .relevance_grader(Arc::new(LlmRelevanceGrader::new(
//!         provider.clone(), config.grader.clone(), meter.clone(),
//!     )))
//!     .generator(Arc::new(LlmGenerator::new(
//!         provider.clone(), config.generator.clone(), meter.clone(),
//!     )))
//!     .groundedness_grader(Arc::new(LlmGroundednessGrader::new(
//!         provider.clone(), config.grader.clone(), meter.clone(),
//!     )))
//!     .usefulness_grader(Arc::new(LlmUsefulnessGrader::new(
//!         provider.clone(), config.grader.clone(), meter.clone(),
//!     )))
//!     .query_rewriter(Arc::new(LlmQueryRewriter::new(
//!         provider.clone(), config.grader.clone(), meter.clone(),
//!     )))
//!     .config(config)
//!     .usage_meter(meter)
//!     .build()?;
//!
//! let result = engine.run("what is the boiling point of water?").await?;
//! println!("{}", result.report.answer);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod capabilities;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod generation;
pub mod grading;
pub mod prompts;
pub mod providers;
pub mod usage;

pub use capabilities::{
    CapabilityError, Generator, GroundednessGrader, QueryRewriter, RelevanceGrader, Retriever,
    UsefulnessGrader,
};
pub use config::{ConfigError, EngineConfig};
pub use corpus::{CorpusError, CorpusRetriever};
pub use engine::{BuildError, RunError, RunResult, SelfRag, SelfRagBuilder};
pub use usage::{LlmUsage, UsageMeter};
