use thiserror::Error;

/// Errors surfaced by training, forecasting and their collaborators.
///
/// None of these are retried inside the crate; callers decide whether to rerun.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Insufficient data: need at least {required} prices, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Insufficient history: need the last {required} prices, got {available}")]
    InsufficientHistory { required: usize, available: usize },

    #[error("Model not loaded: {reason}")]
    ModelNotLoaded { reason: String },

    #[error("Store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Training diverged at epoch {epoch}: loss = {loss}")]
    Divergence { epoch: usize, loss: f64 },

    #[error("Invalid price series: {reason}")]
    InvalidSeries { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl ForecastError {
    pub fn store(reason: impl std::fmt::Display) -> Self {
        ForecastError::StoreUnavailable {
            reason: reason.to_string(),
        }
    }

    pub fn model(reason: impl std::fmt::Display) -> Self {
        ForecastError::ModelNotLoaded {
            reason: reason.to_string(),
        }
    }

    pub fn config(reason: impl std::fmt::Display) -> Self {
        ForecastError::InvalidConfig {
            reason: reason.to_string(),
        }
    }
}
