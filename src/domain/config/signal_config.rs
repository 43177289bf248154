use crate::domain::errors::ForecastError;
use crate::domain::trading::signal::ReferenceBasis;

/// Signal derivation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    /// Close that per-day signals and the trend are measured against
    pub reference: ReferenceBasis,

    /// Mean change (percent) beyond which the trend is STRONG_*
    pub strong_trend_threshold_pct: f64,
}

impl SignalConfig {
    pub fn new(
        reference: ReferenceBasis,
        strong_trend_threshold_pct: f64,
    ) -> Result<Self, ForecastError> {
        if !strong_trend_threshold_pct.is_finite() || strong_trend_threshold_pct <= 0.0 {
            return Err(ForecastError::config(format!(
                "strong_trend_threshold_pct must be positive, got {}",
                strong_trend_threshold_pct
            )));
        }

        Ok(Self {
            reference,
            strong_trend_threshold_pct,
        })
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            reference: ReferenceBasis::Yesterday,
            strong_trend_threshold_pct: 2.0,
        }
    }
}
