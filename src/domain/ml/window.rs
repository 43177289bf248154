//! Fixed-length input windows and supervised pair construction.

use crate::domain::errors::ForecastError;

/// A fixed-length run of consecutive normalized prices.
///
/// The length is set at construction and never changes: sliding appends the
/// newest value and drops the oldest.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    values: Vec<f64>,
}

impl Window {
    pub fn new(values: Vec<f64>, seq_length: usize) -> Result<Self, ForecastError> {
        if seq_length == 0 || values.len() != seq_length {
            return Err(ForecastError::InsufficientHistory {
                required: seq_length,
                available: values.len(),
            });
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// FIFO slide: append `next`, drop the oldest value.
    pub fn slide(&mut self, next: f64) {
        self.values.rotate_left(1);
        if let Some(last) = self.values.last_mut() {
            *last = next;
        }
    }
}

/// One supervised training example: input window and next close.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPair {
    pub input: Vec<f64>,
    pub target: f64,
}

/// Every `(values[i..i+seq_length], values[i+seq_length])` pair.
///
/// Produces exactly `values.len() - seq_length` pairs (zero when the series is
/// not longer than the window).
pub fn supervised_pairs(values: &[f64], seq_length: usize) -> Vec<TrainingPair> {
    if seq_length == 0 || values.len() <= seq_length {
        return Vec::new();
    }

    values
        .windows(seq_length + 1)
        .map(|w| TrainingPair {
            input: w[..seq_length].to_vec(),
            target: w[seq_length],
        })
        .collect()
}

/// Split point for a temporal train/validation partition.
pub fn split_index(pair_count: usize, train_split: f64) -> usize {
    (pair_count as f64 * train_split).floor() as usize
}

/// Smallest pair count whose split leaves at least one pair on each side.
///
/// `train_split` must lie in (0, 1); anything else yields `usize::MAX`.
pub fn min_pairs_for_split(train_split: f64) -> usize {
    if !(train_split > 0.0 && train_split < 1.0) {
        return usize::MAX;
    }
    let mut n = ((1.0 / train_split).ceil() as usize).max(2);
    while split_index(n, train_split) < 1 || split_index(n, train_split) >= n {
        n += 1;
    }
    n
}
