//! Reflex CLI
//!
//! Runs self-reflective RAG questions against a JSON corpus file, and
//! checks that a provider and corpus are usable before spending tokens.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use reflex_runtime::cache::CachedProvider;
use reflex_runtime::config::EngineConfig;
use reflex_runtime::corpus::CorpusRetriever;
use reflex_runtime::engine::{RunError, SelfRag};
use reflex_runtime::generation::{LlmGenerator, LlmQueryRewriter};
use reflex_runtime::grading::{LlmGroundednessGrader, LlmRelevanceGrader, LlmUsefulnessGrader};
use reflex_runtime::providers::{LlmProvider, ProviderRegistry};
use reflex_runtime::usage::UsageMeter;

/// Self-reflective RAG over a local corpus
#[derive(Parser, Debug)]
#[command(name = "reflex")]
#[command(about = "Self-reflective RAG over a local corpus", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to an engine config file (YAML)
    #[arg(short, long, global = true, env = "REFLEX_CONFIG")]
    config: Option<PathBuf>,

    /// LLM provider (anthropic, openai)
    #[arg(short, long, global = true, env = "REFLEX_PROVIDER", default_value = "openai")]
    provider: String,

    /// Model identifier, overriding the config for every capability
    #[arg(short, long, global = true, env = "REFLEX_MODEL")]
    model: Option<String>,

    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question against a corpus
    Ask {
        /// The question to answer
        question: String,

        /// Path to a JSON corpus file
        #[arg(long)]
        corpus: PathBuf,

        /// Override the transition budget
        #[arg(long)]
        max_steps: Option<u32>,

        /// Documents to retrieve per query
        #[arg(long)]
        top_k: Option<usize>,

        /// Emit the full run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate provider credentials and corpus without running
    Check {
        /// Path to a JSON corpus file
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
}

fn init_logging(filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;

    let filter = filter
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn build_provider(
    registry: &ProviderRegistry,
    provider_type: &str,
    config: &EngineConfig,
) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let provider = registry
        .create(provider_type, &serde_json::json!({}))
        .with_context(|| format!("creating provider '{}'", provider_type))?;

    Ok(if config.cache_completions {
        Arc::new(CachedProvider::with_defaults(provider))
    } else {
        provider
    })
}

fn build_engine(
    provider: Arc<dyn LlmProvider>,
    retriever: Arc<CorpusRetriever>,
    config: EngineConfig,
    meter: UsageMeter,
) -> anyhow::Result<SelfRag> {
    let engine = SelfRag::builder()
        .retriever(retriever)
        .relevance_grader(Arc::new(LlmRelevanceGrader::new(
            provider.clone(),
            config.grader.clone(),
            meter.clone(),
        )))
        .generator(Arc::new(LlmGenerator::new(
            provider.clone(),
            config.generator.clone(),
            meter.clone(),
        )))
        .groundedness_grader(Arc::new(LlmGroundednessGrader::new(
            provider.clone(),
            config.grader.clone(),
            meter.clone(),
        )))
        .usefulness_grader(Arc::new(LlmUsefulnessGrader::new(
            provider.clone(),
            config.grader.clone(),
            meter.clone(),
        )))
        .query_rewriter(Arc::new(LlmQueryRewriter::new(
            provider,
            config.grader.clone(),
            meter.clone(),
        )))
        .config(config)
        .usage_meter(meter)
        .build()?;

    Ok(engine)
}

async fn run_ask(
    cli: &Cli,
    question: &str,
    corpus: &PathBuf,
    max_steps: Option<u32>,
    top_k: Option<usize>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let mut config = load_config(cli.config.as_ref())?;
    if let Some(max_steps) = max_steps {
        config.max_transitions = max_steps;
    }
    if let Some(model) = &cli.model {
        config.generator.model = model.clone();
        config.grader.model = model.clone();
    }
    config.validate()?;

    let mut retriever = CorpusRetriever::from_file(corpus)
        .with_context(|| format!("loading corpus from {}", corpus.display()))?;
    if let Some(top_k) = top_k {
        retriever = retriever.with_top_k(top_k);
    }
    tracing::info!(documents = retriever.len(), "corpus loaded");

    let registry = ProviderRegistry::with_defaults();
    let provider = build_provider(&registry, &cli.provider, &config)?;
    let meter = UsageMeter::new();
    let engine = build_engine(provider, Arc::new(retriever), config, meter)?;

    match engine.run(question).await {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                    "answer": result.report.answer,
                    "question": result.report.question,
                    "transitions": result.report.transitions,
                    "finished_at": result.report.finished_at,
                    "usage": result.usage,
                }))?);
            } else {
                println!("{}", result.report.answer);
                eprintln!(
                    "[{} transitions, {} model calls, {} tokens]",
                    result.report.transitions, result.usage.llm_calls, result.usage.total_tokens
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(RunError::NonConvergence {
            transitions,
            last_generation,
        }) => {
            eprintln!(
                "warning: no accepted answer after {} transitions",
                transitions
            );
            match last_generation {
                Some(draft) => {
                    eprintln!("warning: the draft below failed its quality checks");
                    println!("{}", draft);
                }
                None => eprintln!("no draft was produced"),
            }
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

async fn run_check(cli: &Cli, corpus: Option<&PathBuf>) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_ref())?;
    let mut ok = true;

    let registry = ProviderRegistry::with_defaults();
    match registry.validate(&cli.provider, &serde_json::json!({})) {
        Ok(()) => {
            let provider = build_provider(&registry, &cli.provider, &config)?;
            if provider.health_check().await {
                println!("provider '{}': ok", cli.provider);
            } else {
                println!("provider '{}': credentials missing or empty", cli.provider);
                ok = false;
            }
        }
        Err(err) => {
            println!("provider '{}': {}", cli.provider, err);
            ok = false;
        }
    }

    if let Some(corpus) = corpus {
        match CorpusRetriever::from_file(corpus) {
            Ok(retriever) => {
                println!("corpus {}: {} documents", corpus.display(), retriever.len())
            }
            Err(err) => {
                println!("corpus {}: {}", corpus.display(), err);
                ok = false;
            }
        }
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match &cli.command {
        Commands::Ask {
            question,
            corpus,
            max_steps,
            top_k,
            json,
        } => run_ask(&cli, question, corpus, *max_steps, *top_k, *json).await,
        Commands::Check { corpus } => run_check(&cli, corpus.as_ref()).await,
    }
}
