//! Train the LSTM price model and persist the best checkpoint.
//!
//! # Usage
//! ```sh
//! cargo run --bin train -- --source csv --csv data/btc_daily.csv --epochs 200
//! ```
//!
//! Settings come from the environment (see `.env`), flags override them.

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use pricecast::application::pipeline::TrainingPipeline;
use pricecast::application::reporting::render_training_summary;
use pricecast::config::{Config, redact_url};
use pricecast::domain::market::InstrumentId;
use pricecast::domain::ports::PriceStore;
use pricecast::infrastructure::{CsvPriceStore, Database, JsonBundleStore, SqlitePriceStore};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    /// SQLite price table at DATABASE_URL
    Db,
    /// CSV file with timestamp,close rows
    Csv,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Train the LSTM price model", long_about = None)]
struct Args {
    /// Where historical closes are read from
    #[arg(long, value_enum, default_value_t = Source::Db)]
    source: Source,

    /// CSV file for --source csv (defaults to PRICE_CSV_PATH)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Instrument UUID (defaults to INSTRUMENT_ID)
    #[arg(long)]
    instrument: Option<String>,

    /// Output bundle path (defaults to BUNDLE_PATH)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of most recent closes used for training
    #[arg(long)]
    history_limit: Option<usize>,

    #[arg(long)]
    seq_length: Option<usize>,

    #[arg(long)]
    prediction_steps: Option<usize>,

    #[arg(long)]
    hidden_size: Option<usize>,

    #[arg(long)]
    epochs: Option<usize>,

    /// Epochs without validation improvement before stopping
    #[arg(long)]
    patience: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    /// Seed for weight initialisation
    #[arg(long)]
    seed: Option<u64>,
}

impl Args {
    fn apply(&self, config: &mut Config) -> Result<()> {
        let model = &mut config.model;
        model.seq_length = self.seq_length.unwrap_or(model.seq_length);
        model.prediction_steps = self.prediction_steps.unwrap_or(model.prediction_steps);
        model.hidden_size = self.hidden_size.unwrap_or(model.hidden_size);
        model.epochs = self.epochs.unwrap_or(model.epochs);
        model.patience = self.patience.unwrap_or(model.patience);
        model.learning_rate = self.learning_rate.unwrap_or(model.learning_rate);
        model.seed = self.seed.unwrap_or(model.seed);

        let store = &mut config.store;
        if let Some(id) = &self.instrument {
            store.instrument_id = InstrumentId::from_str(id)
                .with_context(|| format!("Invalid --instrument '{}'", id))?;
        }
        if let Some(path) = &self.output {
            store.bundle_path = path.clone();
        }
        if let Some(path) = &self.csv {
            store.price_csv_path = Some(path.clone());
        }
        store.training_history_limit = self
            .history_limit
            .unwrap_or(store.training_history_limit);
        Ok(())
    }
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
    let mut config = Config::from_env()?;
    args.apply(&mut config)?;

    let training = config
        .training_config()
        .context("Invalid training configuration")?;
    info!(
        "Training config: seq={}, steps={}, hidden={}, epochs={}, patience={}, lr={}",
        training.seq_length,
        training.prediction_steps,
        training.hidden_size,
        training.epochs,
        training.patience,
        training.learning_rate
    );

    let prices: Arc<dyn PriceStore> = match args.source {
        Source::Db => {
            info!("Reading prices from {}", redact_url(&config.store.database_url));
            let db = Database::new(&config.store.database_url).await?;
            Arc::new(SqlitePriceStore::new(db.pool))
        }
        Source::Csv => {
            let Some(path) = &config.store.price_csv_path else {
                bail!("--source csv needs --csv or PRICE_CSV_PATH");
            };
            Arc::new(CsvPriceStore::open(path).context("Failed to load price CSV")?)
        }
    };

    let pipeline = TrainingPipeline::new(
        prices,
        Arc::new(JsonBundleStore::new()),
        config.store.bundle_path.clone(),
        config.store.instrument_id,
        config.store.training_history_limit,
    );

    let outcome = pipeline.run(training).await.context("Training failed")?;

    println!("{}", render_training_summary(&outcome.report));
    println!("Model saved to {}", config.store.bundle_path.display());
    Ok(())
}
