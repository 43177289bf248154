//! Model and training hyperparameters from environment variables.

use super::{Lookup, parse_var};
use anyhow::Result;

/// Model environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEnvConfig {
    // Shape
    pub seq_length: usize,
    pub prediction_steps: usize,
    pub hidden_size: usize,

    // Training loop
    pub epochs: usize,
    pub patience: usize,
    pub learning_rate: f64,
    pub grad_clip_norm: f64,
    pub train_split: f64,
    pub seed: u64,
}

impl ModelEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        Ok(Self {
            seq_length: parse_var(lookup, "SEQ_LENGTH", 10)?,
            prediction_steps: parse_var(lookup, "PREDICTION_STEPS", 5)?,
            hidden_size: parse_var(lookup, "HIDDEN_SIZE", 64)?,
            epochs: parse_var(lookup, "EPOCHS", 100)?,
            patience: parse_var(lookup, "PATIENCE", 10)?,
            learning_rate: parse_var(lookup, "LEARNING_RATE", 0.001)?,
            grad_clip_norm: parse_var(lookup, "GRAD_CLIP_NORM", 1.0)?,
            train_split: parse_var(lookup, "TRAIN_SPLIT", 0.8)?,
            seed: parse_var(lookup, "TRAINING_SEED", 42)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_model_config_defaults() {
        let config = ModelEnvConfig::from_lookup(&|_| None).unwrap();
        assert_eq!(config.seq_length, 10);
        assert_eq!(config.prediction_steps, 5);
        assert_eq!(config.hidden_size, 64);
        assert_eq!(config.epochs, 100);
        assert_eq!(config.patience, 10);
        assert_eq!(config.learning_rate, 0.001);
        assert_eq!(config.train_split, 0.8);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_model_config_overrides() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("SEQ_LENGTH", "30"), ("LEARNING_RATE", "0.01")]);
        let config =
            ModelEnvConfig::from_lookup(&|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.seq_length, 30);
        assert_eq!(config.learning_rate, 0.01);
        assert_eq!(config.hidden_size, 64);
    }

    #[test]
    fn test_model_config_rejects_garbage() {
        let err = ModelEnvConfig::from_lookup(&|key| {
            (key == "EPOCHS").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("EPOCHS"));
    }
}
