//! Persisted unit of a trained model.
//!
//! A bundle carries everything the forecaster needs to reproduce
//! predictions: weights, the three shape hyperparameters and the fitted
//! normalizer. It is written once per validation improvement and never
//! modified after creation.

use crate::domain::errors::ForecastError;
use crate::domain::market::InstrumentId;
use crate::domain::ml::lstm::{LstmRegressor, LstmWeights};
use crate::domain::ml::normalizer::MinMaxNormalizer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub seq_length: usize,
    pub prediction_steps: usize,
    pub hidden_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub instrument_id: Option<InstrumentId>,
    pub hyperparameters: Hyperparameters,
    pub normalizer: MinMaxNormalizer,
    pub weights: LstmWeights,
    pub best_val_loss: f64,
    pub best_epoch: usize,
    pub created_at: DateTime<Utc>,
}

impl ModelBundle {
    pub fn new(
        hyperparameters: Hyperparameters,
        normalizer: MinMaxNormalizer,
        weights: LstmWeights,
        best_val_loss: f64,
        best_epoch: usize,
    ) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            instrument_id: None,
            hyperparameters,
            normalizer,
            weights,
            best_val_loss,
            best_epoch,
            created_at: Utc::now(),
        }
    }

    pub fn with_instrument(mut self, instrument_id: InstrumentId) -> Self {
        self.instrument_id = Some(instrument_id);
        self
    }

    /// Reject bundles that could not have been produced by the trainer.
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(ForecastError::model(format!(
                "unsupported bundle format version {} (expected {})",
                self.format_version, BUNDLE_FORMAT_VERSION
            )));
        }

        let hp = &self.hyperparameters;
        if hp.seq_length == 0 || hp.prediction_steps == 0 || hp.hidden_size == 0 {
            return Err(ForecastError::model(format!(
                "hyperparameters must be positive: {:?}",
                hp
            )));
        }

        if !self.weights.is_consistent(hp.hidden_size) {
            return Err(ForecastError::model(format!(
                "weights do not match hidden size {}",
                hp.hidden_size
            )));
        }

        if !self.weights.is_finite() {
            return Err(ForecastError::model("weights contain non-finite values"));
        }

        if !self.normalizer.min.is_finite() || !self.normalizer.max.is_finite() {
            return Err(ForecastError::model("normalizer parameters are not finite"));
        }

        Ok(())
    }

    /// Rebuild the regressor described by this bundle.
    pub fn regressor(&self) -> Result<LstmRegressor, ForecastError> {
        self.validate()?;
        LstmRegressor::from_weights(self.weights.clone())
    }
}
