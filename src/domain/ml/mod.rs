// Persisted model unit
pub mod bundle;

// Recurrent network
pub mod lstm;

// Scaling and windowing
pub mod normalizer;
pub mod window;

pub use bundle::{Hyperparameters, ModelBundle};
pub use lstm::{LstmGradients, LstmRegressor, LstmWeights};
pub use normalizer::MinMaxNormalizer;
pub use window::{TrainingPair, Window};
