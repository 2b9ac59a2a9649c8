//! llm-eval server - Entry Point
//!
//! Serves the experiment and validation HTTP API.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_eval::experiment::{Orchestrator, OrchestratorConfig, RunStore, SqliteRunStore};
use llm_eval::http::{build_router, AppState};
use llm_eval::provider::{AnthropicProvider, OpenAiProvider, ProviderRouter};
use llm_eval::tokens::EncodingTokenCounter;
use llm_eval::validation::SchemaValidator;

/// Compare LLM outputs across providers and track every run.
#[derive(Parser, Debug)]
#[command(name = "llm-eval-server", author, version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000", env = "LLM_EVAL_BIND")]
    bind: String,

    /// SQLite database file (`:memory:` for an in-memory database)
    #[arg(long, default_value = "llm_eval.db", env = "LLM_EVAL_DATABASE")]
    database: String,

    /// Directory holding `graph_format.json` and `evaluation_metadata.json`
    /// (bundled schemas otherwise)
    #[arg(long, env = "LLM_EVAL_SCHEMA_DIR")]
    schema_dir: Option<PathBuf>,

    /// Sampling temperature for every model call
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    /// Per-call timeout in seconds (unbounded when omitted)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn open_store(database: &str) -> anyhow::Result<Arc<dyn RunStore>> {
    let store = if database == ":memory:" {
        SqliteRunStore::open_in_memory()
    } else {
        SqliteRunStore::open(database)
    }
    .with_context(|| format!("failed to open database {database}"))?;
    info!(database, "using SQLite run store");
    Ok(Arc::new(store))
}

fn provider_router() -> ProviderRouter {
    let mut router = ProviderRouter::new();
    match OpenAiProvider::from_env() {
        Ok(provider) => router = router.register("openai", Arc::new(provider)),
        Err(e) => warn!(error = %e, "openai provider disabled"),
    }
    match AnthropicProvider::from_env() {
        Ok(provider) => router = router.register("anthropic", Arc::new(provider)),
        Err(e) => warn!(error = %e, "anthropic provider disabled"),
    }
    info!(providers = ?router.providers(), "providers registered");
    router
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "llm_eval=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let validator = match &args.schema_dir {
        Some(dir) => SchemaValidator::from_dir(dir),
        None => SchemaValidator::bundled(),
    }
    .context("failed to load validation schemas")?;

    let mut config = OrchestratorConfig::new().with_temperature(args.temperature);
    if let Some(secs) = args.timeout_secs {
        config = config.with_call_timeout(Duration::from_secs(secs));
    }

    let orchestrator = Orchestrator::new(
        open_store(&args.database)?,
        Arc::new(provider_router()),
        Arc::new(EncodingTokenCounter::new()),
    )
    .with_config(config);

    let app = build_router(AppState::new(Arc::new(orchestrator), Arc::new(validator)));

    let listener = TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(addr = %args.bind, "llm-eval server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
