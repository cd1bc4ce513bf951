use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docsweep_client::{
    HttpLoader, MeilisearchClient, SearchConfig, StrategyCatalog, WebhookConfig, WebhookReporter,
};
use docsweep_core::classify::is_paginated;
use docsweep_core::models::{CrawlReport, CrawlSpec};
use docsweep_core::traits::PageLoader;
use docsweep_core::{
    CrawlService, CrawlerEngine, EngineConfig, FanOutReporter, ProgressConfig,
    TracingProgressReporter, UrlClassifier, normalize_link,
};

#[derive(Parser)]
#[command(name = "docsweep", version, about = "Crawl a documentation site into a Meilisearch index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the site described by a crawl spec and publish the index
    Crawl {
        /// Path to the JSON crawl spec
        #[arg(short, long)]
        config: PathBuf,

        /// Render pages in Chromium (requires the `browser` feature)
        #[arg(long, default_value_t = false)]
        browser: bool,

        /// Override the crawl spec's max_concurrency
        #[arg(long)]
        concurrency: Option<usize>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<usize>,

        /// Meilisearch URL, used when the crawl spec has none
        #[arg(long, env = "MEILISEARCH_URL")]
        meilisearch_url: Option<String>,

        /// Meilisearch API key, used when the crawl spec has none
        #[arg(long, env = "MEILISEARCH_API_KEY", hide_env_values = true)]
        meilisearch_api_key: Option<String>,
    },

    /// Show how a crawl spec classifies the given URLs
    Check {
        /// Path to the JSON crawl spec
        #[arg(short, long)]
        config: PathBuf,

        /// URLs to classify
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("docsweep=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl {
            config,
            browser,
            concurrency,
            max_pages,
            meilisearch_url,
            meilisearch_api_key,
        } => {
            let mut spec = load_spec(&config)?;
            if let Some(concurrency) = concurrency {
                spec.max_concurrency = concurrency;
            }
            if max_pages.is_some() {
                spec.max_pages = max_pages;
            }
            let fallback = meilisearch_url.map(|url| SearchConfig {
                url,
                api_key: meilisearch_api_key,
            });
            let search = SearchConfig::resolve(&spec, fallback.as_ref())?;

            let report = if browser {
                crawl_with_browser(spec, &search).await?
            } else {
                let loader = HttpLoader::with_options(Duration::from_secs(30), spec.user_agent.as_deref())
                    .context("Failed to create HTTP client")?
                    .allow_private_urls();
                cmd_crawl(loader, spec, &search).await?
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Check { config, urls } => {
            let spec = load_spec(&config)?;
            cmd_check(&spec, &urls)?;
        }
    }

    Ok(())
}

fn load_spec(path: &Path) -> Result<CrawlSpec> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read crawl spec: {}", path.display()))?;
    CrawlSpec::from_json(&raw).with_context(|| format!("Invalid crawl spec: {}", path.display()))
}

#[cfg(feature = "browser")]
async fn crawl_with_browser(spec: CrawlSpec, search: &SearchConfig) -> Result<CrawlReport> {
    let loader = docsweep_client::BrowserLoader::launch(spec.headless)
        .await
        .context("Failed to launch browser")?;
    cmd_crawl(loader, spec, search).await
}

#[cfg(not(feature = "browser"))]
async fn crawl_with_browser(_spec: CrawlSpec, _search: &SearchConfig) -> Result<CrawlReport> {
    anyhow::bail!("--browser requires docsweep to be built with the `browser` feature")
}

async fn cmd_crawl<L: PageLoader>(
    loader: L,
    spec: CrawlSpec,
    search: &SearchConfig,
) -> Result<CrawlReport> {
    let engine = CrawlerEngine::new(loader, EngineConfig::from_spec(&spec));
    let client = MeilisearchClient::new(search).context("Failed to create Meilisearch client")?;

    let webhook = WebhookConfig::from_env()
        .map(WebhookReporter::new)
        .transpose()
        .context("Failed to create webhook client")?;
    let reporter = Arc::new(FanOutReporter::new(TracingProgressReporter, webhook));
    let progress = ProgressConfig::from_env()?;

    tracing::info!(
        index = %spec.index_uid,
        meilisearch = %search.url,
        strategy = ?spec.strategy,
        "Starting crawl"
    );
    let service = CrawlService::new(engine, client, StrategyCatalog, reporter, progress);
    let report = service.run(spec).await?;

    tracing::info!(
        index = %report.index_uid,
        pages_visited = report.stats.pages_visited,
        documents_sent = report.stats.documents_sent,
        swapped = report.swapped,
        "Crawl finished"
    );
    Ok(report)
}

fn cmd_check(spec: &CrawlSpec, urls: &[String]) -> Result<()> {
    let classifier = UrlClassifier::from_spec(spec)?;
    let filter = classifier.link_filter();

    for url in urls {
        let normalized = normalize_link(url);
        let target = normalized.as_deref().unwrap_or(url);
        let line = match (classifier.is_indexable(target), is_paginated(target)) {
            (Ok(indexable), Ok(paginated)) => serde_json::json!({
                "url": url,
                "normalized": normalized,
                "enqueued": normalized.is_some() && filter.allows(url),
                "indexable": indexable,
                "paginated": paginated,
            }),
            (Err(e), _) | (_, Err(e)) => serde_json::json!({
                "url": url,
                "error": e.to_string(),
            }),
        };
        println!("{line}");
    }
    Ok(())
}
