use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use newsroom_agent::core::config::{AppPaths, AppSettings, ConfigService};
use newsroom_agent::core::logging;
use newsroom_agent::ingest::{read_url_list, BatchReport, GuidelineIngestor, HttpPageFetcher, NewsIngestor};
use newsroom_agent::state::Backends;

#[derive(Parser)]
#[command(name = "newsroom-ingest")]
#[command(about = "Load news articles or editorial guidelines into the vector collections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a JSON array of news records
    News {
        /// Dataset file (default: news-dataset.json)
        path: Option<PathBuf>,
    },
    /// Fetch and ingest guideline pages listed one URL per line
    Guidelines {
        /// URL list file (default: pages.txt)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths, "ingest.log");

    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;

    let report = match cli.command {
        Commands::News { path } => {
            let path = input_path(&paths, path.as_deref(), "news-dataset.json");
            ingest_news(&paths, &settings, &path).await?
        }
        Commands::Guidelines { path } => {
            let path = input_path(&paths, path.as_deref(), "pages.txt");
            match ingest_guidelines(&paths, &settings, &path).await? {
                Some(report) => report,
                None => return Ok(()),
            }
        }
    };

    summarize(&report);
    Ok(())
}

fn input_path(paths: &AppPaths, given: Option<&Path>, default: &str) -> PathBuf {
    match given {
        Some(path) => paths.resolve_input_path(&path.to_string_lossy()),
        None => paths.resolve_input_path(default),
    }
}

async fn ingest_news(paths: &AppPaths, settings: &AppSettings, path: &Path) -> anyhow::Result<BatchReport> {
    let ingestion = &settings.ingestion;
    let backends = Backends::open(paths, settings).await?;
    tracing::info!("Ingesting news from {}", path.display());
    NewsIngestor::new(backends.news, ingestion.news_chunk_size, ingestion.news_chunk_overlap)
        .ingest_file(path)
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))
}

async fn ingest_guidelines(
    paths: &AppPaths,
    settings: &AppSettings,
    path: &Path,
) -> anyhow::Result<Option<BatchReport>> {
    let ingestion = &settings.ingestion;
    let urls = read_url_list(path)?;
    if urls.is_empty() {
        tracing::warn!("No URLs found in {}", path.display());
        return Ok(None);
    }
    tracing::info!("Found {} URL(s) in {}", urls.len(), path.display());

    let backends = Backends::open(paths, settings).await?;
    let fetcher = HttpPageFetcher::new(Duration::from_secs(ingestion.page_timeout_secs))?;
    let report = GuidelineIngestor::new(
        backends.guidelines,
        Arc::new(fetcher),
        ingestion.guideline_chunk_size,
        ingestion.guideline_chunk_overlap,
    )
    .ingest_urls(&urls)
    .await;
    Ok(Some(report))
}

fn summarize(report: &BatchReport) {
    if report.failed() > 0 {
        tracing::warn!("Ingestion finished with failures: {}", report);
    } else {
        tracing::info!("Ingestion finished: {}", report);
    }
}
