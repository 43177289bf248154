use crate::domain::errors::ForecastError;
use serde::{Deserialize, Serialize};

/// Min-max scaler mapping the fitted range onto [0, 1].
///
/// Values outside the fitted range extrapolate linearly; nothing is clamped.
/// A zero-width range uses a scale of 1 so constant series stay invertible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxNormalizer {
    pub min: f64,
    pub max: f64,
}

impl MinMaxNormalizer {
    pub fn fit(values: &[f64]) -> Result<Self, ForecastError> {
        if values.is_empty() {
            return Err(ForecastError::InsufficientData {
                required: 1,
                available: 0,
            });
        }

        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return Err(ForecastError::InvalidSeries {
                reason: "cannot fit normalizer on non-finite values".to_string(),
            });
        }

        Ok(Self { min, max })
    }

    fn range(&self) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 { 1.0 } else { range }
    }

    pub fn normalize(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.range() + self.min
    }

    pub fn normalize_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.normalize(*v)).collect()
    }

    pub fn denormalize_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|v| self.denormalize(*v)).collect()
    }
}
