//! Load a CSV of daily closes into the SQLite price table.
//!
//! # Usage
//! ```sh
//! cargo run --bin import_prices -- data/btc_daily.csv
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use pricecast::config::{Config, redact_url};
use pricecast::domain::market::InstrumentId;
use pricecast::infrastructure::{CsvPriceStore, Database, SqlitePriceStore};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Import closes from CSV into SQLite", long_about = None)]
struct Args {
    /// CSV file with timestamp,close rows
    input: PathBuf,

    /// Instrument UUID (defaults to INSTRUMENT_ID)
    #[arg(long)]
    instrument: Option<String>,

    /// Database URL (defaults to DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let instrument_id = match &args.instrument {
        Some(id) => InstrumentId::from_str(id)
            .with_context(|| format!("Invalid --instrument '{}'", id))?,
        None => config.store.instrument_id,
    };
    let database_url = args
        .database_url
        .clone()
        .unwrap_or_else(|| config.store.database_url.clone());

    let source = CsvPriceStore::open(&args.input).context("Failed to load price CSV")?;
    let db = Database::new(&database_url).await?;
    let store = SqlitePriceStore::new(db.pool);

    let written = store
        .insert_series(&instrument_id, source.series())
        .await
        .context("Failed to import prices")?;
    let total = store.count(&instrument_id).await?;

    info!(
        "Imported {} rows for {} into {} ({} stored)",
        written,
        instrument_id,
        redact_url(&database_url),
        total
    );
    Ok(())
}
