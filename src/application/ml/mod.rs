pub mod forecaster;
pub mod optimizer;
pub mod predictor;
pub mod trainer;

pub use forecaster::{Forecast, Forecaster};
pub use optimizer::Adam;
pub use predictor::SequencePredictor;
pub use trainer::{EpochMetrics, Trainer, TrainingOutcome, TrainingReport};
