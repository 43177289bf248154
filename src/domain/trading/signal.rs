//! Trading signals derived from a forecast horizon.
//!
//! Per-day records compare each forecast price against the reference close
//! (yesterday by default), the current close, and the previous forecast
//! value. The aggregate trend is classified from the mean change against
//! the reference.

use crate::domain::config::SignalConfig;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

const CONFIDENCE_DIVISOR: f64 = 2.0;
const CONFIDENCE_CAP: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    StrongBullish,
    Bullish,
    Bearish,
    StrongBearish,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::StrongBullish => "STRONG_BULLISH",
            Trend::Bullish => "BULLISH",
            Trend::Bearish => "BEARISH",
            Trend::StrongBearish => "STRONG_BEARISH",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Sell,
    StrongSell,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Recommendation::StrongBuy => "STRONG_BUY",
            Recommendation::Buy => "BUY",
            Recommendation::Sell => "SELL",
            Recommendation::StrongSell => "STRONG_SELL",
        };
        write!(f, "{}", s)
    }
}

impl Trend {
    /// Classify a mean percentage change against a symmetric threshold.
    pub fn classify(mean_change_pct: f64, strong_threshold_pct: f64) -> Self {
        if mean_change_pct > strong_threshold_pct {
            Trend::StrongBullish
        } else if mean_change_pct > 0.0 {
            Trend::Bullish
        } else if mean_change_pct > -strong_threshold_pct {
            Trend::Bearish
        } else {
            Trend::StrongBearish
        }
    }

    pub fn recommendation(&self) -> Recommendation {
        match self {
            Trend::StrongBullish => Recommendation::StrongBuy,
            Trend::Bullish => Recommendation::Buy,
            Trend::Bearish => Recommendation::Sell,
            Trend::StrongBearish => Recommendation::StrongSell,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Trend::StrongBullish => "Strong upward momentum expected",
            Trend::Bullish => "Positive trend expected",
            Trend::Bearish => "Negative trend expected",
            Trend::StrongBearish => "Significant downward pressure",
        }
    }
}

/// Which observed close signals are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceBasis {
    Yesterday,
    Current,
}

impl std::str::FromStr for ReferenceBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yesterday" => Ok(ReferenceBasis::Yesterday),
            "current" | "today" => Ok(ReferenceBasis::Current),
            other => Err(format!(
                "Invalid reference basis: {}. Must be 'yesterday' or 'current'",
                other
            )),
        }
    }
}

/// Observed closes the forecast is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceAnchors {
    pub current: f64,
    pub yesterday: f64,
}

impl PriceAnchors {
    pub fn new(current: f64, yesterday: f64) -> Self {
        Self { current, yesterday }
    }

    pub fn reference(&self, basis: ReferenceBasis) -> f64 {
        match basis {
            ReferenceBasis::Yesterday => self.yesterday,
            ReferenceBasis::Current => self.current,
        }
    }

    /// Today's move relative to yesterday, in percent.
    pub fn today_change(&self) -> f64 {
        pct_change(self.current, self.yesterday)
    }
}

/// Percentage change of `value` relative to `base`.
pub fn pct_change(value: f64, base: f64) -> f64 {
    (value - base) / base * 100.0
}

/// One forecasted day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub day: usize,
    pub date: Option<NaiveDate>,
    pub predicted_price: f64,
    pub change_vs_reference: f64,
    pub change_vs_current: f64,
    pub change_day_to_day: f64,
    pub signal: Signal,
    pub confidence: f64,
}

impl PredictionRecord {
    /// `previous` is the price this day is compared against day to day:
    /// the current close for day 1, the prior forecast afterwards.
    pub fn derive(
        day: usize,
        date: Option<NaiveDate>,
        predicted_price: f64,
        reference: f64,
        current: f64,
        previous: f64,
    ) -> Self {
        let change_vs_reference = pct_change(predicted_price, reference);
        let signal = if change_vs_reference > 0.0 {
            Signal::Buy
        } else {
            Signal::Sell
        };

        Self {
            day,
            date,
            predicted_price,
            change_vs_reference,
            change_vs_current: pct_change(predicted_price, current),
            change_day_to_day: pct_change(predicted_price, previous),
            signal,
            confidence: (change_vs_reference.abs() / CONFIDENCE_DIVISOR).min(CONFIDENCE_CAP),
        }
    }
}

/// Build one record per forecast price, day numbers starting at 1.
pub fn derive_records(
    prices: &[f64],
    anchors: &PriceAnchors,
    basis: ReferenceBasis,
    start_date: Option<NaiveDate>,
) -> Vec<PredictionRecord> {
    let reference = anchors.reference(basis);
    let mut previous = anchors.current;

    prices
        .iter()
        .enumerate()
        .map(|(idx, &price)| {
            let day = idx + 1;
            let date = start_date.and_then(|d| d.checked_add_days(chrono::Days::new(day as u64)));
            let record =
                PredictionRecord::derive(day, date, price, reference, anchors.current, previous);
            previous = price;
            record
        })
        .collect()
}

/// Horizon-level summary of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend: Trend,
    pub recommendation: Recommendation,
    pub description: String,
    pub average_change: f64,
    pub final_day_change: f64,
    pub upward_days: usize,
    pub downward_days: usize,
    pub expected_final_price: f64,
}

impl TrendAnalysis {
    /// `None` for an empty horizon.
    pub fn from_records(records: &[PredictionRecord], config: &SignalConfig) -> Option<Self> {
        let last = records.last()?;
        let average_change = records.iter().map(|r| r.change_vs_reference).sum::<f64>()
            / records.len() as f64;

        let upward_days = records
            .windows(2)
            .filter(|w| w[1].predicted_price > w[0].predicted_price)
            .count();
        let downward_days = records.len() - 1 - upward_days;

        let trend = Trend::classify(average_change, config.strong_trend_threshold_pct);

        Some(Self {
            trend,
            recommendation: trend.recommendation(),
            description: trend.description().to_string(),
            average_change,
            final_day_change: last.change_vs_reference,
            upward_days,
            downward_days,
            expected_final_price: last.predicted_price,
        })
    }
}
