//! Price source and model location from environment variables.

use super::{Lookup, parse_var};
use crate::domain::market::InstrumentId;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// BTC/USD in the shared prices table
pub const DEFAULT_INSTRUMENT_ID: &str = "730ecbc1-c10d-11f0-930e-a68413f72443";

/// Store environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEnvConfig {
    pub database_url: String,
    pub instrument_id: InstrumentId,
    /// Most recent closes loaded for training
    pub training_history_limit: usize,
    /// Extra closes fetched beyond the model window when forecasting
    pub history_margin: usize,
    pub bundle_path: PathBuf,
    pub price_csv_path: Option<PathBuf>,
}

impl StoreEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let instrument_raw =
            lookup("INSTRUMENT_ID").unwrap_or_else(|| DEFAULT_INSTRUMENT_ID.to_string());
        let instrument_id = InstrumentId::from_str(instrument_raw.trim())
            .with_context(|| format!("Failed to parse INSTRUMENT_ID '{}'", instrument_raw))?;

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://data/prices.db".to_string()),
            instrument_id,
            training_history_limit: parse_var(lookup, "TRAINING_HISTORY_LIMIT", 365)?,
            history_margin: parse_var(lookup, "HISTORY_MARGIN", 10)?,
            bundle_path: lookup("BUNDLE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/models/btc_lstm.json")),
            price_csv_path: lookup("PRICE_CSV_PATH")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        })
    }
}
