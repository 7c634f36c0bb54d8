use anyhow::{Context, Result};
use async_openai::config::OpenAIConfig;
use async_openai::Client as OpenAIClient;
use clap::{Parser, Subcommand};
use ollama_rs::Ollama;
use std::env;
use std::fs;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use signalfeed::config::{get_env_var_as_vec, PipelineConfig};
use signalfeed::enrich::run_enrichment;
use signalfeed::ledger::{FileLedgerStore, Ledger};
use signalfeed::llm::LlmAnalyzer;
use signalfeed::logging::configure_logging;
use signalfeed::render::render_site;
use signalfeed::rss::fetch_articles;
use signalfeed::store::{CorpusStore, JsonCorpusStore};
use signalfeed::types::Article;
use signalfeed::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

#[derive(Parser)]
#[clap(name = "signalfeed", about = "RSS aggregation with AI enrichment")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch configured feeds and snapshot the articles to disk
    Fetch,

    /// Enrich one batch of unprocessed articles
    Enrich,

    /// Render the static site from the enriched corpus
    Render,

    /// Fetch, enrich, and render in one pass
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let args = Cli::parse();
    let config = PipelineConfig::from_env();
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;

    match args.command {
        Commands::Fetch => {
            fetch_and_snapshot(&config).await?;
        }
        Commands::Enrich => {
            let fetched = load_snapshot(&config)?;
            enrich_batch(fetched, &config).await?;
        }
        Commands::Render => {
            render_to_disk(&config)?;
        }
        Commands::Run => {
            let fetched = fetch_and_snapshot(&config).await?;
            enrich_batch(fetched, &config).await?;
            render_to_disk(&config)?;
        }
    }

    Ok(())
}

async fn fetch_and_snapshot(config: &PipelineConfig) -> Result<Vec<Article>> {
    let feed_urls = get_env_var_as_vec("FEED_URLS", ';');
    if feed_urls.is_empty() {
        anyhow::bail!("FEED_URLS is not set; provide a ';' separated list of feed URLs");
    }

    let articles = fetch_articles(&feed_urls).await?;
    let json = serde_json::to_string_pretty(&articles)?;
    fs::write(config.articles_path(), json)
        .with_context(|| format!("failed to write {}", config.articles_path().display()))?;
    Ok(articles)
}

fn load_snapshot(config: &PipelineConfig) -> Result<Vec<Article>> {
    let path = config.articles_path();
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("no fetched articles at {}; run fetch first", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

async fn enrich_batch(fetched: Vec<Article>, config: &PipelineConfig) -> Result<()> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_err() {
            error!("Failed to listen for ctrl-c");
        }
        let _ = cancel_tx.send(true);
    });

    let analyzer = LlmAnalyzer::new(llm_params_from_env()?);
    let mut ledger = Ledger::open(Box::new(FileLedgerStore::new(config.ledger_path())))?;
    let mut corpus_store = JsonCorpusStore::new(config.corpus_path());

    let report = run_enrichment(
        fetched,
        &mut ledger,
        &mut corpus_store as &mut dyn CorpusStore,
        &analyzer,
        config,
        Some(&cancel_rx),
    )
    .await?;

    info!(
        target: TARGET_LLM_REQUEST,
        "Run complete: {} attempted, {} succeeded, {} still unprocessed",
        report.attempted,
        report.succeeded,
        report.remaining
    );
    Ok(())
}

fn render_to_disk(config: &PipelineConfig) -> Result<()> {
    let mut corpus_store = JsonCorpusStore::new(config.corpus_path());
    let corpus = corpus_store.load()?;
    fs::create_dir_all(&config.site_dir)
        .with_context(|| format!("failed to create {}", config.site_dir.display()))?;
    let page = render_site(&corpus);
    fs::write(config.site_path(), page)
        .with_context(|| format!("failed to write {}", config.site_path().display()))?;
    info!("Rendered {} articles to {}", corpus.len(), config.site_path().display());
    Ok(())
}

fn llm_params_from_env() -> Result<LLMParams> {
    let provider = env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string());

    let llm_client = match provider.as_str() {
        "ollama" => {
            let host = env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".to_string());
            let port: u16 = env::var("OLLAMA_PORT")
                .unwrap_or_else(|_| "11434".to_string())
                .parse()
                .unwrap_or(11434);
            info!("Connecting to Ollama at {}:{}", host, port);
            LLMClient::Ollama(Ollama::new(host, port))
        }
        "openai" => {
            let api_key =
                env::var("OPENAI_API_KEY").context("OPENAI_API_KEY required for openai provider")?;
            let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
            // DeepSeek and other compatible endpoints work through the same client.
            if let Ok(api_base) = env::var("OPENAI_API_BASE") {
                openai_config = openai_config.with_api_base(api_base);
            }
            LLMClient::OpenAI(OpenAIClient::with_config(openai_config))
        }
        other => anyhow::bail!("unknown LLM_PROVIDER '{}'; expected ollama or openai", other),
    };

    let model = env::var("LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string());
    let temperature: f32 = env::var("LLM_TEMPERATURE")
        .unwrap_or_else(|_| "0.3".to_string())
        .parse()
        .unwrap_or(0.3);
    let max_tokens: u32 = env::var("LLM_MAX_TOKENS")
        .unwrap_or_else(|_| "1000".to_string())
        .parse()
        .unwrap_or(1000);

    Ok(LLMParams {
        llm_client,
        model,
        temperature,
        max_tokens,
    })
}
