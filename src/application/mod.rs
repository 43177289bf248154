// Model training, rollout and the optimizer
pub mod ml;

// Store-backed training and forecasting flows
pub mod pipeline;

// JSON and console output
pub mod reporting;
