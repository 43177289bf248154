//! Configuration domain module
//!
//! Validated value objects handed to the trainer and forecaster. They are
//! built from `crate::config` (environment) or directly in code and tests.

pub mod signal_config;
pub mod training_config;

pub use signal_config::SignalConfig;
pub use training_config::{TrainingConfig, TrainingConfigError};
