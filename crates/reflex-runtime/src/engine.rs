//! The run engine: an explicit state machine over injected capabilities.
//!
//! The engine owns exactly the plumbing: execute the current node against
//! its capability, write the result into the run state, ask the routing
//! predicates where to go next. All decisions live in `reflex_core`; all
//! model and retrieval calls live behind the capability traits. The only
//! error handling here is propagation, plus the transition budget that
//! turns the two repair loops into a bounded computation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::try_join_all;
use thiserror::Error;

use reflex_core::routing::{
    decide_to_generate, filter_relevant, route_groundedness, route_usefulness,
};
use reflex_core::{Node, RunReport, RunState, StateError, StepBudget};

use crate::capabilities::{
    CapabilityError, Generator, GroundednessGrader, QueryRewriter, RelevanceGrader, Retriever,
    UsefulnessGrader,
};
use crate::config::EngineConfig;
use crate::prompts::format_evidence;
use crate::usage::{LlmUsage, UsageMeter};

/// Errors ending a run without an accepted answer.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("question must not be empty")]
    EmptyQuestion,

    /// The retrieval backend failed. Never masked as "no documents found":
    /// an empty retrieval is a routing input, a failed retrieval is not.
    #[error("retrieval failed: {0}")]
    Retrieval(String),

    /// A grader or rewriter answered outside its declared contract.
    #[error("{capability} violated its contract: got {got:?}, expected one of {expected:?}")]
    ContractViolation {
        capability: &'static str,
        got: String,
        expected: &'static [&'static str],
    },

    /// A capability failed for infrastructure reasons (transport, auth).
    #[error("capability failed: {0}")]
    Capability(String),

    /// A single capability call outran the configured deadline.
    #[error("capability call exceeded {0:?}")]
    Timeout(Duration),

    /// The transition budget ran out before both checks passed.
    ///
    /// Carries the last generation, if any, so the caller can surface a
    /// clearly-labeled degraded answer instead of nothing.
    #[error("no accepted answer after {transitions} transitions")]
    NonConvergence {
        transitions: u32,
        last_generation: Option<String>,
    },
}

impl From<CapabilityError> for RunError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::RetrievalUnavailable(msg) => RunError::Retrieval(msg),
            CapabilityError::ContractViolation {
                capability,
                got,
                expected,
            } => RunError::ContractViolation {
                capability,
                got,
                expected,
            },
            CapabilityError::Llm(msg) => RunError::Capability(msg),
        }
    }
}

impl From<StateError> for RunError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::EmptyQuestion => RunError::EmptyQuestion,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// The accepted answer and run summary.
    pub report: RunReport,

    /// LLM usage accumulated across the run.
    pub usage: LlmUsage,
}

/// A self-reflective RAG engine over injected capabilities.
///
/// Build one with [`SelfRagBuilder`] and run questions through
/// [`run`](SelfRag::run). The engine is stateless between runs; each run
/// gets a fresh [`RunState`] and [`StepBudget`].
pub struct SelfRag {
    retriever: Arc<dyn Retriever>,
    relevance: Arc<dyn RelevanceGrader>,
    generator: Arc<dyn Generator>,
    groundedness: Arc<dyn GroundednessGrader>,
    usefulness: Arc<dyn UsefulnessGrader>,
    rewriter: Arc<dyn QueryRewriter>,
    config: EngineConfig,
    meter: UsageMeter,
}

impl std::fmt::Debug for SelfRag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfRag")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SelfRag {
    /// Start building an engine.
    pub fn builder() -> SelfRagBuilder {
        SelfRagBuilder::default()
    }

    /// Run one question to completion.
    ///
    /// Returns the accepted answer, or the first error the machine cannot
    /// route around. The engine retries nothing: regeneration and query
    /// rewriting are transitions the grades demand, not error recovery.
    pub async fn run(&self, question: &str) -> Result<RunResult, RunError> {
        let mut state = RunState::new(question)?;
        let budget = StepBudget::new(self.config.max_transitions);
        let mut node = Node::Retrieve;

        tracing::info!(question = state.question(), "run started");

        loop {
            if !budget.try_take() {
                tracing::warn!(
                    transitions = budget.taken(),
                    "transition budget exhausted"
                );
                return Err(RunError::NonConvergence {
                    transitions: budget.taken(),
                    last_generation: state.into_generation(),
                });
            }

            tracing::debug!(node = %node, step = budget.taken(), "executing node");

            node = match node {
                Node::Retrieve => {
                    let documents = self
                        .bounded(self.retriever.fetch(state.question()))
                        .await?;
                    tracing::debug!(retrieved = documents.len(), "retrieval complete");
                    state.replace_documents(documents);
                    Node::GradeDocuments
                }

                Node::GradeDocuments => {
                    // Each verdict depends only on its own (question, chunk)
                    // pair, so the calls fan out concurrently, each under
                    // its own deadline. Results come back in input order,
                    // which filter_relevant requires.
                    let documents = state.documents().to_vec();
                    let grades = try_join_all(documents.iter().map(|chunk| {
                        self.bounded(self.relevance.grade(state.question(), &chunk.content))
                    }))
                    .await?;

                    let filtered = filter_relevant(documents, &grades);
                    tracing::debug!(kept = filtered.len(), "relevance filtering complete");
                    state.replace_documents(filtered);
                    decide_to_generate(state.documents())
                }

                Node::TransformQuery => {
                    let rewritten = self
                        .bounded(self.rewriter.rewrite(state.question()))
                        .await?;
                    state.rewrite_question(rewritten);
                    Node::Retrieve
                }

                Node::Generate => {
                    let evidence = format_evidence(state.documents());
                    let generation = self
                        .bounded(self.generator.generate(state.question(), &evidence))
                        .await?;
                    state.set_generation(generation);
                    Node::GradeGroundedness
                }

                Node::GradeGroundedness => {
                    let evidence = format_evidence(state.documents());
                    let generation = state.generation().unwrap_or("");
                    let grade = self
                        .bounded(self.groundedness.grade(&evidence, generation))
                        .await?;
                    state.record_groundedness(grade);
                    route_groundedness(grade)
                }

                Node::GradeUsefulness => {
                    let generation = state.generation().unwrap_or("");
                    let grade = self
                        .bounded(self.usefulness.grade(state.question(), generation))
                        .await?;
                    state.record_usefulness(grade);

                    match route_usefulness(grade) {
                        Some(next) => next,
                        None => {
                            let transitions = budget.taken();
                            let answer =
                                state.generation().unwrap_or("").to_string();
                            tracing::info!(transitions, "run accepted an answer");

                            return Ok(RunResult {
                                report: RunReport {
                                    answer,
                                    question: state.question().to_string(),
                                    transitions,
                                    finished_at: Utc::now(),
                                },
                                usage: self.meter.snapshot(),
                            });
                        }
                    }
                }
            };
        }
    }

    /// Apply the per-call deadline to one capability call.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CapabilityError>>,
    ) -> Result<T, RunError> {
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result.map_err(RunError::from),
            Err(_) => Err(RunError::Timeout(self.config.call_timeout)),
        }
    }
}

/// Builder for [`SelfRag`].
#[derive(Default)]
pub struct SelfRagBuilder {
    retriever: Option<Arc<dyn Retriever>>,
    relevance: Option<Arc<dyn RelevanceGrader>>,
    generator: Option<Arc<dyn Generator>>,
    groundedness: Option<Arc<dyn GroundednessGrader>>,
    usefulness: Option<Arc<dyn UsefulnessGrader>>,
    rewriter: Option<Arc<dyn QueryRewriter>>,
    config: Option<EngineConfig>,
    meter: Option<UsageMeter>,
}

impl SelfRagBuilder {
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn relevance_grader(mut self, grader: Arc<dyn RelevanceGrader>) -> Self {
        self.relevance = Some(grader);
        self
    }

    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn groundedness_grader(mut self, grader: Arc<dyn GroundednessGrader>) -> Self {
        self.groundedness = Some(grader);
        self
    }

    pub fn usefulness_grader(mut self, grader: Arc<dyn UsefulnessGrader>) -> Self {
        self.usefulness = Some(grader);
        self
    }

    pub fn query_rewriter(mut self, rewriter: Arc<dyn QueryRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share a usage meter with the capabilities so the run result reports
    /// their token totals.
    pub fn usage_meter(mut self, meter: UsageMeter) -> Self {
        self.meter = Some(meter);
        self
    }

    pub fn build(self) -> Result<SelfRag, BuildError> {
        Ok(SelfRag {
            retriever: self.retriever.ok_or(BuildError::Missing("retriever"))?,
            relevance: self
                .relevance
                .ok_or(BuildError::Missing("relevance grader"))?,
            generator: self.generator.ok_or(BuildError::Missing("generator"))?,
            groundedness: self
                .groundedness
                .ok_or(BuildError::Missing("groundedness grader"))?,
            usefulness: self
                .usefulness
                .ok_or(BuildError::Missing("usefulness grader"))?,
            rewriter: self.rewriter.ok_or(BuildError::Missing("query rewriter"))?,
            config: self.config.unwrap_or_default(),
            meter: self.meter.unwrap_or_default(),
        })
    }
}

/// Error building an engine with a capability missing.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("engine requires a {0}")]
    Missing(&'static str),
}
