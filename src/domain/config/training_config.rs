//! Training Configuration Domain Value Object
//!
//! Hyperparameters for the trainer, validated on construction. The 80/20
//! temporal split and the gradient-clip ceiling are defaults, not invariants.

use crate::domain::errors::ForecastError;
use crate::domain::ml::Hyperparameters;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TrainingConfigError {
    #[error("Invalid size: {field} = {value}. Must be positive")]
    InvalidSize { field: String, value: usize },

    #[error("Invalid train split: {value}. Must be strictly between 0.0 and 1.0")]
    InvalidSplit { value: f64 },

    #[error("Invalid rate: {field} = {value}. Must be finite and non-negative")]
    InvalidRate { field: String, value: f64 },
}

impl From<TrainingConfigError> for ForecastError {
    fn from(err: TrainingConfigError) -> Self {
        ForecastError::config(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Window length fed to the network
    pub seq_length: usize,

    /// Forecast horizon stored in the bundle for the forecaster
    pub prediction_steps: usize,

    /// LSTM hidden units
    pub hidden_size: usize,

    /// Upper bound on epochs when early stopping never triggers
    pub epochs: usize,

    /// Epochs without validation improvement before stopping
    pub patience: usize,

    /// Adam step size
    pub learning_rate: f64,

    /// Global gradient L2 norm ceiling
    pub grad_clip_norm: f64,

    /// Fraction of pairs used for training (earliest first)
    pub train_split: f64,

    /// Seed for weight initialisation
    pub seed: u64,
}

impl TrainingConfig {
    pub fn new(
        seq_length: usize,
        prediction_steps: usize,
        hidden_size: usize,
        epochs: usize,
        patience: usize,
    ) -> Result<Self, TrainingConfigError> {
        let config = Self {
            seq_length,
            prediction_steps,
            hidden_size,
            epochs,
            patience,
            ..Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_grad_clip_norm(mut self, grad_clip_norm: f64) -> Self {
        self.grad_clip_norm = grad_clip_norm;
        self
    }

    pub fn with_train_split(mut self, train_split: f64) -> Self {
        self.train_split = train_split;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), TrainingConfigError> {
        for (field, value) in [
            ("seq_length", self.seq_length),
            ("prediction_steps", self.prediction_steps),
            ("hidden_size", self.hidden_size),
            ("epochs", self.epochs),
            ("patience", self.patience),
        ] {
            if value == 0 {
                return Err(TrainingConfigError::InvalidSize {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if !(self.train_split > 0.0 && self.train_split < 1.0) {
            return Err(TrainingConfigError::InvalidSplit {
                value: self.train_split,
            });
        }

        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(TrainingConfigError::InvalidRate {
                field: "learning_rate".to_string(),
                value: self.learning_rate,
            });
        }

        // a zero clip norm scales every gradient to zero
        if !self.grad_clip_norm.is_finite() || self.grad_clip_norm <= 0.0 {
            return Err(TrainingConfigError::InvalidRate {
                field: "grad_clip_norm".to_string(),
                value: self.grad_clip_norm,
            });
        }

        Ok(())
    }

    pub fn hyperparameters(&self) -> Hyperparameters {
        Hyperparameters {
            seq_length: self.seq_length,
            prediction_steps: self.prediction_steps,
            hidden_size: self.hidden_size,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seq_length: 10,
            prediction_steps: 5,
            hidden_size: 64,
            epochs: 100,
            patience: 10,
            learning_rate: 0.001,
            grad_clip_norm: 1.0,
            train_split: 0.8,
            seed: 42,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seq_length, 10);
        assert_eq!(config.prediction_steps, 5);
        assert_eq!(config.hidden_size, 64);
        assert_eq!(config.train_split, 0.8);
    }

    #[test]
    fn test_zero_patience_is_rejected() {
        assert_eq!(
            TrainingConfig::new(10, 5, 64, 100, 0).unwrap_err(),
            TrainingConfigError::InvalidSize {
                field: "patience".to_string(),
                value: 0,
            }
        );
    }

    #[test]
    fn test_split_bounds() {
        assert!(
            TrainingConfig::default()
                .with_train_split(1.0)
                .validate()
                .is_err()
        );
        assert!(
            TrainingConfig::default()
                .with_train_split(0.0)
                .validate()
                .is_err()
        );
        assert!(
            TrainingConfig::default()
                .with_train_split(0.7)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_negative_learning_rate_is_rejected() {
        let err = TrainingConfig::default()
            .with_learning_rate(-0.1)
            .validate()
            .unwrap_err();
        assert!(matches!(err, TrainingConfigError::InvalidRate { .. }));
    }

    #[test]
    fn test_zero_learning_rate_is_allowed() {
        assert!(
            TrainingConfig::default()
                .with_learning_rate(0.0)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_zero_clip_norm_is_rejected() {
        let err = TrainingConfig::default()
            .with_grad_clip_norm(0.0)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            TrainingConfigError::InvalidRate {
                field: "grad_clip_norm".to_string(),
                value: 0.0,
            }
        );
        assert!(
            TrainingConfig::default()
                .with_grad_clip_norm(0.5)
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_converts_into_forecast_error() {
        let err: ForecastError = TrainingConfigError::InvalidSplit { value: 2.0 }.into();
        assert!(matches!(err, ForecastError::InvalidConfig { .. }));
    }
}
