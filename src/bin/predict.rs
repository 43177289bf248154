//! Forecast the next closes with a trained bundle and print BUY/SELL signals.
//!
//! # Usage
//! ```sh
//! cargo run --bin predict            # console table
//! cargo run --bin predict -- --json  # machine-readable report
//! ```
//!
//! With `--json` every failure is reported as `{"success": false, ...}` on
//! stdout and the process exits with status 1.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pricecast::application::pipeline::ForecastPipeline;
use pricecast::application::reporting::{ErrorReport, ForecastReport, render_table};
use pricecast::config::{Config, redact_url};
use pricecast::domain::market::InstrumentId;
use pricecast::domain::ports::PriceStore;
use pricecast::domain::trading::ReferenceBasis;
use pricecast::infrastructure::{CsvPriceStore, Database, JsonBundleStore, SqlitePriceStore};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Db,
    Csv,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Forecast prices with a trained LSTM bundle", long_about = None)]
struct Args {
    /// Print a JSON report instead of the table
    #[arg(long)]
    json: bool,

    #[arg(long, value_enum, default_value_t = Source::Db)]
    source: Source,

    /// CSV file for --source csv (defaults to PRICE_CSV_PATH)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Instrument UUID (defaults to INSTRUMENT_ID)
    #[arg(long)]
    instrument: Option<String>,

    /// Bundle to load (defaults to BUNDLE_PATH)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Close that signals compare against: yesterday or current
    #[arg(long)]
    reference: Option<String>,
}

async fn run(args: &Args) -> Result<ForecastReport> {
    let mut config = Config::from_env()?;
    if let Some(id) = &args.instrument {
        config.store.instrument_id = InstrumentId::from_str(id)
            .with_context(|| format!("Invalid --instrument '{}'", id))?;
    }
    if let Some(path) = &args.model {
        config.store.bundle_path = path.clone();
    }
    if let Some(path) = &args.csv {
        config.store.price_csv_path = Some(path.clone());
    }
    if let Some(reference) = &args.reference {
        config.signal.reference =
            ReferenceBasis::from_str(reference).map_err(anyhow::Error::msg)?;
    }
    let signal = config.signal_config().context("Invalid signal configuration")?;

    let prices: Arc<dyn PriceStore> = match args.source {
        Source::Db => {
            info!("Reading prices from {}", redact_url(&config.store.database_url));
            let db = Database::new(&config.store.database_url).await?;
            Arc::new(SqlitePriceStore::new(db.pool))
        }
        Source::Csv => {
            let path = config
                .store
                .price_csv_path
                .as_ref()
                .context("--source csv needs --csv or PRICE_CSV_PATH")?;
            Arc::new(CsvPriceStore::open(path).context("Failed to load price CSV")?)
        }
    };

    let pipeline = ForecastPipeline::new(
        prices,
        Arc::new(JsonBundleStore::new()),
        config.store.bundle_path.clone(),
        config.store.instrument_id,
        config.store.history_margin,
    );

    pipeline.run(signal).await.context("Forecast failed")
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // stdout is reserved for the report
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let args = Args::parse();

    match run(&args).await {
        Ok(report) if args.json => match report.to_json() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                print_error(&anyhow::Error::new(e).context("Failed to serialize report"));
                ExitCode::FAILURE
            }
        },
        Ok(report) => {
            println!("{}", render_table(&report));
            ExitCode::SUCCESS
        }
        Err(e) if args.json => {
            print_error(&e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_error(error: &anyhow::Error) {
    let report = ErrorReport::from_anyhow(error);
    match report.to_json() {
        Ok(json) => println!("{}", json),
        Err(_) => println!(
            "{{\"success\": false, \"error\": {:?}, \"timestamp\": \"{}\"}}",
            report.error,
            report.timestamp.to_rfc3339()
        ),
    }
}
