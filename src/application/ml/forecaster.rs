//! Autoregressive multi-step forecaster.
//!
//! The model only ever predicts one step. Longer horizons are produced by
//! feeding each prediction back into the window and dropping the oldest
//! value, so errors compound with the horizon.

use crate::application::ml::predictor::SequencePredictor;
use crate::domain::config::SignalConfig;
use crate::domain::errors::ForecastError;
use crate::domain::market::PriceSeries;
use crate::domain::ml::{Hyperparameters, LstmRegressor, MinMaxNormalizer, ModelBundle, Window};
use crate::domain::trading::signal::{self, PredictionRecord, PriceAnchors, TrendAnalysis};
use chrono::NaiveDate;
use tracing::debug;

/// Result of one forecast run.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// Date of the last observed close; record dates count from here
    pub base_date: NaiveDate,
    pub anchors: PriceAnchors,
    pub records: Vec<PredictionRecord>,
    pub trend: TrendAnalysis,
}

pub struct Forecaster<P: SequencePredictor = LstmRegressor> {
    predictor: P,
    normalizer: MinMaxNormalizer,
    seq_length: usize,
    prediction_steps: usize,
    signal: SignalConfig,
}

impl Forecaster<LstmRegressor> {
    /// Build a forecaster from a persisted bundle.
    ///
    /// Shape mismatches surface as `ModelNotLoaded`.
    pub fn from_bundle(bundle: &ModelBundle, signal: SignalConfig) -> Result<Self, ForecastError> {
        let predictor = bundle.regressor()?;
        Ok(Self::new(
            predictor,
            bundle.normalizer,
            bundle.hyperparameters,
            signal,
        ))
    }
}

impl<P: SequencePredictor> Forecaster<P> {
    pub fn new(
        predictor: P,
        normalizer: MinMaxNormalizer,
        hyperparameters: Hyperparameters,
        signal: SignalConfig,
    ) -> Self {
        Self {
            predictor,
            normalizer,
            seq_length: hyperparameters.seq_length,
            prediction_steps: hyperparameters.prediction_steps,
            signal,
        }
    }

    pub fn seq_length(&self) -> usize {
        self.seq_length
    }

    pub fn prediction_steps(&self) -> usize {
        self.prediction_steps
    }

    pub fn predictor_name(&self) -> &str {
        self.predictor.name()
    }

    /// Predict `prediction_steps` prices following `history`.
    ///
    /// Only the trailing `seq_length` values are used. Output is in price
    /// units.
    pub fn rollout(&self, history: &[f64]) -> Result<Vec<f64>, ForecastError> {
        if history.len() < self.seq_length {
            return Err(ForecastError::InsufficientHistory {
                required: self.seq_length,
                available: history.len(),
            });
        }

        let tail = &history[history.len() - self.seq_length..];
        if tail.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidSeries {
                reason: "history contains non-finite prices".to_string(),
            });
        }

        let mut window = Window::new(self.normalizer.normalize_all(tail), self.seq_length)?;
        let mut normalized = Vec::with_capacity(self.prediction_steps);
        for step in 0..self.prediction_steps {
            let next = self.predictor.predict(window.as_slice());
            debug!("{} step {}: {:.6}", self.predictor.name(), step + 1, next);
            normalized.push(next);
            window.slide(next);
        }

        Ok(self.normalizer.denormalize_all(&normalized))
    }

    /// Forecast from an observed series and derive per-day signals.
    pub fn forecast(&self, series: &PriceSeries) -> Result<Forecast, ForecastError> {
        let history = series
            .trailing_closes(self.seq_length)
            .ok_or(ForecastError::InsufficientHistory {
                required: self.seq_length,
                available: series.len(),
            })?;
        let last = series.last().ok_or(ForecastError::InsufficientHistory {
            required: self.seq_length,
            available: 0,
        })?;
        let yesterday = series.previous().map_or(last.close, |p| p.close);
        let anchors = PriceAnchors::new(last.close, yesterday);
        let base_date = last.timestamp.date_naive();

        let prices = self.rollout(&history)?;
        let records =
            signal::derive_records(&prices, &anchors, self.signal.reference, Some(base_date));
        let trend = TrendAnalysis::from_records(&records, &self.signal).ok_or(
            ForecastError::InvalidConfig {
                reason: "prediction_steps must be positive".to_string(),
            },
        )?;

        Ok(Forecast {
            base_date,
            anchors,
            records,
            trend,
        })
    }
}
