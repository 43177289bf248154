//! Signal derivation settings from environment variables.

use super::{Lookup, parse_var};
use crate::domain::trading::ReferenceBasis;
use anyhow::{Result, anyhow};
use std::str::FromStr;

/// Signal environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEnvConfig {
    pub reference: ReferenceBasis,
    pub strong_trend_threshold_pct: f64,
}

impl SignalEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let reference_raw = lookup("SIGNAL_REFERENCE").unwrap_or_else(|| "yesterday".to_string());
        let reference = ReferenceBasis::from_str(&reference_raw)
            .map_err(|e| anyhow!("Failed to parse SIGNAL_REFERENCE: {}", e))?;

        Ok(Self {
            reference,
            strong_trend_threshold_pct: parse_var(lookup, "STRONG_TREND_THRESHOLD_PCT", 2.0)?,
        })
    }
}
