use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jobscout_core::{EmbeddingBackend, ListingStore, Notifier, SearchIntent};
use jobscout_local::embed::{self, OllamaEmbeddings, OpenAiCompatEmbeddings};
use jobscout_local::pipeline::{SearchConfig, SearchOrchestrator};
use jobscout_local::store::{LogNotifier, MemoryStore};
use jobscout_local::{intent, rank, LocalFetcher, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "jobscout")]
#[command(about = "Job-listing search/extract/rank plumbing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search listings for a query or an explicit title/location (json to stdout).
    Search(SearchCmd),
    /// Show the search intent derived from a free-text query (json).
    Interpret(InterpretCmd),
    /// Print version info.
    Version,
}

#[derive(clap::Args, Debug)]
struct SearchCmd {
    /// Free-text query, e.g. "backend developer london".
    #[arg(long)]
    query: Option<String>,
    /// Explicit job title; with --location, bypasses query interpretation.
    #[arg(long)]
    title: Option<String>,
    /// Explicit location; with --title, bypasses query interpretation.
    #[arg(long)]
    location: Option<String>,
    /// Target listings per (title, location) pair.
    #[arg(long, default_value_t = 5)]
    count: usize,
    /// Embeddings backend for ranking. Allowed: auto, ollama, openai-compat, off
    #[arg(long, default_value = "auto")]
    embeddings: String,
    /// Query used for ranking (defaults to --query).
    #[arg(long)]
    rank_query: Option<String>,
    /// Search-results endpoint override (useful against fixtures).
    #[arg(long)]
    base_url: Option<String>,
    /// Pacing delay between (title, location) pairs.
    #[arg(long)]
    pair_delay_ms: Option<u64>,
    /// Pacing delay between detail fetches within a pair.
    #[arg(long)]
    detail_delay_ms: Option<u64>,
    #[arg(long, default_value_t = 15_000)]
    search_timeout_ms: u64,
    #[arg(long, default_value_t = 10_000)]
    detail_timeout_ms: u64,
    /// Notify this recipient of the results (repeatable).
    #[arg(long)]
    recipient: Vec<String>,
}

#[derive(clap::Args, Debug)]
struct InterpretCmd {
    /// Free-text query to interpret.
    #[arg(long)]
    query: String,
}

fn derive_intent(cmd: &SearchCmd) -> Result<SearchIntent> {
    match (&cmd.title, &cmd.location) {
        (Some(t), Some(l)) => Ok(SearchIntent::explicit(t.clone(), l.clone())?),
        _ => {
            let q = cmd
                .query
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("pass --query, or both --title and --location"))?;
            Ok(intent::interpret(q))
        }
    }
}

fn embeddings_backend(mode: &str) -> Result<Option<Box<dyn EmbeddingBackend>>> {
    let client = reqwest::Client::new();
    match mode {
        "off" => Ok(None),
        "ollama" => Ok(Some(Box::new(OllamaEmbeddings::from_env(client)?))),
        "openai-compat" => Ok(Some(Box::new(OpenAiCompatEmbeddings::from_env(client)?))),
        "auto" => match embed::from_env_auto(client) {
            Ok(b) => Ok(Some(b)),
            Err(e) => {
                tracing::warn!(error = %e, "no embeddings backend configured; results are unranked");
                Ok(None)
            }
        },
        other => anyhow::bail!("unknown embeddings mode: {other}"),
    }
}

async fn run_search(cmd: SearchCmd) -> Result<()> {
    let intent = derive_intent(&cmd)?;

    let mut cfg = SearchConfig {
        jobs_per_pair: cmd.count,
        search_timeout_ms: cmd.search_timeout_ms,
        detail_timeout_ms: cmd.detail_timeout_ms,
        ..SearchConfig::default()
    };
    if let Some(u) = &cmd.base_url {
        cfg.search_url = u.clone();
    }
    if let Some(ms) = cmd.pair_delay_ms {
        cfg.pair_delay_ms = ms;
    }
    if let Some(ms) = cmd.detail_delay_ms {
        cfg.detail_delay_ms = ms;
    }

    let fetcher = Arc::new(LocalFetcher::new(SessionConfig::default())?);
    let orchestrator = SearchOrchestrator::new(fetcher, cfg);
    let found = orchestrator.search(&intent).await;

    // The persistence collaborator absorbs cross-pair duplicates by link.
    let store = MemoryStore::new();
    let mut unique = Vec::with_capacity(found.len());
    for detail in found {
        if store.upsert(&detail).await? {
            unique.push(detail);
        }
    }

    if !cmd.recipient.is_empty() {
        // Notification trouble must never unwind into the pipeline.
        if let Err(e) = LogNotifier.notify(&unique, &cmd.recipient).await {
            tracing::warn!(error = %e, "notification failed");
        }
    }

    let out = match embeddings_backend(&cmd.embeddings)? {
        Some(backend) => {
            let rank_query = cmd
                .rank_query
                .clone()
                .or_else(|| cmd.query.clone())
                .unwrap_or_else(|| {
                    format!("{} {}", intent.titles.join(" "), intent.locations.join(" "))
                });
            let ranked = rank::rank(backend.as_ref(), &rank_query, unique).await?;
            serde_json::json!({
                "schema_version": 1,
                "intent": intent,
                "ranked": true,
                "results": ranked,
            })
        }
        None => serde_json::json!({
            "schema_version": 1,
            "intent": intent,
            "ranked": false,
            "results": unique,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run_interpret(cmd: InterpretCmd) -> Result<()> {
    let intent = intent::interpret(&cmd.query);
    let out = serde_json::json!({
        "schema_version": 1,
        "intent": intent,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run_version() -> Result<()> {
    let out = serde_json::json!({
        "schema_version": 1,
        "name": "jobscout",
        "version": env!("CARGO_PKG_VERSION"),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the JSON result.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Search(cmd) => run_search(cmd).await,
        Commands::Interpret(cmd) => run_interpret(cmd),
        Commands::Version => run_version(),
    }
}
