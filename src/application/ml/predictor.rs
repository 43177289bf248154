use crate::domain::ml::LstmRegressor;

/// A model that maps a normalized window to the next normalized value.
///
/// Implementations must not carry state between calls.
pub trait SequencePredictor: Send + Sync {
    fn predict(&self, window: &[f64]) -> f64;

    /// Get model name/type
    fn name(&self) -> &str;
}

impl SequencePredictor for LstmRegressor {
    fn predict(&self, window: &[f64]) -> f64 {
        self.forward(window)
    }

    fn name(&self) -> &str {
        "LSTM"
    }
}
