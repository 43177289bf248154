//! Chronological closing-price series.
//!
//! A `PriceSeries` is validated on construction: timestamps strictly
//! increase and every close is a finite, positive number. Once built it is
//! never mutated for the lifetime of a run.

use crate::domain::errors::ForecastError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points that are already in chronological order.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, ForecastError> {
        for (idx, point) in points.iter().enumerate() {
            if !point.close.is_finite() || point.close <= 0.0 {
                return Err(ForecastError::InvalidSeries {
                    reason: format!(
                        "close at {} must be finite and positive, got {}",
                        point.timestamp, point.close
                    ),
                });
            }
            if idx > 0 && points[idx - 1].timestamp >= point.timestamp {
                return Err(ForecastError::InvalidSeries {
                    reason: format!(
                        "timestamps must strictly increase: {} followed by {}",
                        points[idx - 1].timestamp, point.timestamp
                    ),
                });
            }
        }

        Ok(Self { points })
    }

    /// Sort by timestamp first, then validate. Duplicate timestamps are still rejected.
    pub fn from_unordered(mut points: Vec<PricePoint>) -> Result<Self, ForecastError> {
        points.sort_by_key(|p| p.timestamp);
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// The last `n` closes, oldest first. Returns `None` when fewer than `n` exist.
    pub fn trailing_closes(&self, n: usize) -> Option<Vec<f64>> {
        if n > self.points.len() {
            return None;
        }
        Some(
            self.points[self.points.len() - n..]
                .iter()
                .map(|p| p.close)
                .collect(),
        )
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// The close immediately before the latest one.
    pub fn previous(&self) -> Option<&PricePoint> {
        self.points.len().checked_sub(2).map(|idx| &self.points[idx])
    }
}
