// Validated configuration value objects
pub mod config;

// Domain-specific error types
pub mod errors;

// Price series and instruments
pub mod market;

// Model math: normalizer, windows, LSTM, bundle
pub mod ml;

// Port interfaces
pub mod ports;

// Signals and trend classification
pub mod trading;
