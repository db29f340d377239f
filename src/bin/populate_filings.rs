//! Initial population run: company profiles first, then the latest quarterly
//! filing per ticker. Each stage runs the full ticker list through the
//! chunked batch driver; a rejected stage stops the run so later stages do
//! not pile onto a half-populated dataset.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn, Level};
use tracing_subscriber::{self, FmtSubscriber};

use stock_filings::api::{filing_document_client, FilingProvider, FinnhubClient};
use stock_filings::batch_ingester::{ingest_chunked, BatchConfig};
use stock_filings::ingest::fetch_company_filing;
use stock_filings::models::{Config, FieldKey, FilingRecord};

#[derive(Debug, Parser)]
#[command(about = "Populate company profiles and quarterly filings")]
struct Args {
    /// Line-delimited ticker list
    #[arg(long, default_value = "SelectedTicker.txt")]
    tickers: PathBuf,

    /// Output file for ingested records (JSON lines)
    #[arg(long, default_value = "filings.jsonl")]
    output: PathBuf,

    /// Identifiers dispatched concurrently per rate-limit window
    #[arg(long)]
    chunk_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter("stock_filings=info,populate_filings=info")
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let args = Args::parse();

    // Load configuration
    let config = Config::from_env()?;
    info!("📋 Configuration loaded successfully");

    let tickers = read_tickers(&args.tickers)?;
    info!("📊 Found {} tickers to process", tickers.len());

    let locator = FinnhubClient::new(&config)?;
    let documents = filing_document_client(&config.contact_email)?;
    let batch = BatchConfig::new(args.chunk_size.unwrap_or(config.chunk_size));

    let output = tokio::fs::File::create(&args.output)
        .await
        .with_context(|| format!("creating {}", args.output.display()))?;
    let output = Arc::new(Mutex::new(output));

    // Stage 1: company profiles.
    info!("🚀 Stage 1: company profiles");
    let profiles = ingest_chunked(
        &tickers,
        |ticker| {
            let locator = &locator;
            async move { locator.company_profile(&ticker).await }
        },
        |profile| {
            let output = output.clone();
            async move { write_json_line(&output, serde_json::to_value(&profile)?).await }
        },
        &batch,
    )
    .await;

    if profiles.any_rejected {
        warn!("🛑 profile ingestion recorded failures; skipping filing ingestion");
        std::process::exit(1);
    }

    // Stage 2: quarterly filings.
    info!("🚀 Stage 2: quarterly filings");
    let filings = ingest_chunked(
        &tickers,
        |ticker| {
            let locator = &locator;
            let documents = &documents;
            async move { fetch_company_filing(locator, documents, &ticker).await }
        },
        |record: FilingRecord| {
            let output = output.clone();
            async move {
                if !record.is_complete() {
                    // Escalate for manual entry instead of persisting a
                    // partial row.
                    let ticker = record
                        .get(FieldKey::Ticker)
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "unknown ticker".to_string());
                    warn!(
                        "✋ incomplete filing for {} ({} of 9 fields); escalating for manual entry",
                        ticker,
                        record.len()
                    );
                    return Ok(());
                }
                write_json_line(&output, serde_json::to_value(&record)?).await
            }
        },
        &batch,
    )
    .await;

    if filings.any_rejected {
        warn!("🛑 filing ingestion recorded failures");
        std::process::exit(1);
    }

    info!(
        "✅ population complete: {} profiles, {} filings persisted to {}",
        profiles.persisted,
        filings.persisted,
        args.output.display()
    );
    Ok(())
}

fn read_tickers(path: &PathBuf) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading ticker list {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

async fn write_json_line(
    output: &Mutex<tokio::fs::File>,
    value: serde_json::Value,
) -> Result<()> {
    let line = serde_json::to_string(&value)?;
    let mut file = output.lock().await;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    Ok(())
}
