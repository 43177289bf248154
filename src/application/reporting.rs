use crate::application::ml::{Forecast, TrainingReport};
use crate::domain::ml::ModelBundle;
use crate::domain::trading::{PredictionRecord, ReferenceBasis, TrendAnalysis};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model: String,
    pub sequence_length: usize,
    pub prediction_steps: usize,
    pub hidden_size: usize,
    pub best_epoch: usize,
    pub best_val_loss: f64,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionEntry {
    pub day: usize,
    /// `YYYY-MM-DD`
    pub date: Option<String>,
    pub predicted_price: f64,
    pub change_vs_reference: f64,
    /// Same value as `change_vs_reference`, present only on the yesterday basis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_vs_yesterday: Option<f64>,
    pub change_vs_current: f64,
    pub change_day_to_day: f64,
    pub signal: String,
    pub confidence: f64,
}

impl From<&PredictionRecord> for PredictionEntry {
    fn from(record: &PredictionRecord) -> Self {
        Self {
            day: record.day,
            date: record.date.map(|d| d.format("%Y-%m-%d").to_string()),
            predicted_price: record.predicted_price,
            change_vs_reference: record.change_vs_reference,
            change_vs_yesterday: None,
            change_vs_current: record.change_vs_current,
            change_day_to_day: record.change_day_to_day,
            signal: record.signal.to_string(),
            confidence: record.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry {
    pub trend: String,
    pub recommendation: String,
    pub description: String,
    pub average_change: f64,
    pub final_day_change: f64,
    pub total_change: f64,
    pub upward_days: usize,
    pub downward_days: usize,
    pub expected_final_price: f64,
}

impl From<&TrendAnalysis> for AnalysisEntry {
    fn from(analysis: &TrendAnalysis) -> Self {
        Self {
            trend: analysis.trend.to_string(),
            recommendation: analysis.recommendation.to_string(),
            description: analysis.description.clone(),
            average_change: analysis.average_change,
            final_day_change: analysis.final_day_change,
            // horizon total and last-day change share the same reference
            total_change: analysis.final_day_change,
            upward_days: analysis.upward_days,
            downward_days: analysis.downward_days,
            expected_final_price: analysis.expected_final_price,
        }
    }
}

/// Successful forecast payload, printed by `predict --json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReport {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub current_price: f64,
    pub yesterday_price: f64,
    pub today_change: f64,
    pub latest_data_date: String,
    pub reference: ReferenceBasis,
    pub model_info: ModelInfo,
    pub predictions: Vec<PredictionEntry>,
    pub analysis: AnalysisEntry,
}

impl ForecastReport {
    pub fn new(
        forecast: &Forecast,
        bundle: &ModelBundle,
        model_name: &str,
        reference: ReferenceBasis,
    ) -> Self {
        Self {
            success: true,
            timestamp: Utc::now(),
            current_price: forecast.anchors.current,
            yesterday_price: forecast.anchors.yesterday,
            today_change: forecast.anchors.today_change(),
            latest_data_date: forecast.base_date.format("%Y-%m-%d").to_string(),
            reference,
            model_info: ModelInfo {
                model: model_name.to_string(),
                sequence_length: bundle.hyperparameters.seq_length,
                prediction_steps: bundle.hyperparameters.prediction_steps,
                hidden_size: bundle.hyperparameters.hidden_size,
                best_epoch: bundle.best_epoch,
                best_val_loss: bundle.best_val_loss,
                trained_at: bundle.created_at,
            },
            predictions: forecast
                .records
                .iter()
                .map(|record| {
                    let mut entry = PredictionEntry::from(record);
                    if reference == ReferenceBasis::Yesterday {
                        entry.change_vs_yesterday = Some(entry.change_vs_reference);
                    }
                    entry
                })
                .collect(),
            analysis: AnalysisEntry::from(&forecast.trend),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Failure payload, printed by `predict --json` before exiting with 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub success: bool,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }

    /// Renders `{:#}` of an `anyhow::Error` with its context chain.
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        Self::new(format!("{:#}", error))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn reference_label(reference: ReferenceBasis) -> &'static str {
    match reference {
        ReferenceBasis::Yesterday => "vs Yesterday",
        ReferenceBasis::Current => "vs Current",
    }
}

/// Console rendering of a forecast report.
pub fn render_table(report: &ForecastReport) -> String {
    let mut out = String::new();
    let rule = "=".repeat(86);

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "📈 PRICE FORECAST ({} model, {} day horizon)",
        report.model_info.model, report.model_info.prediction_steps
    );
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Latest data:     {}", report.latest_data_date);
    let _ = writeln!(out, "Current price:   ${:.2}", report.current_price);
    let _ = writeln!(
        out,
        "Yesterday price: ${:.2} ({:+.2}% today)",
        report.yesterday_price, report.today_change
    );
    let _ = writeln!(out, "{}", "-".repeat(86));
    let _ = writeln!(
        out,
        "{:>4} | {:<10} | {:>12} | {:>12} | {:>10} | {:>10} | {:<4} | {:>6}",
        "Day",
        "Date",
        "Price",
        reference_label(report.reference),
        "vs Current",
        "Day/Day",
        "Sig",
        "Conf"
    );
    let _ = writeln!(out, "{}", "-".repeat(86));

    for p in &report.predictions {
        let _ = writeln!(
            out,
            "{:>4} | {:<10} | {:>12.2} | {:>11.2}% | {:>9.2}% | {:>9.2}% | {:<4} | {:>5.1}%",
            p.day,
            p.date.as_deref().unwrap_or("-"),
            p.predicted_price,
            p.change_vs_reference,
            p.change_vs_current,
            p.change_day_to_day,
            p.signal,
            p.confidence
        );
    }

    let a = &report.analysis;
    let _ = writeln!(out, "{}", "-".repeat(86));
    let _ = writeln!(out, "Trend:          {} ({})", a.trend, a.description);
    let _ = writeln!(out, "Recommendation: {}", a.recommendation);
    let _ = writeln!(
        out,
        "Average change: {:+.2}%  Final day: {:+.2}%",
        a.average_change, a.final_day_change
    );
    let _ = writeln!(
        out,
        "Up days: {}  Down days: {}  Expected final price: ${:.2}",
        a.upward_days, a.downward_days, a.expected_final_price
    );
    let _ = writeln!(out, "{}", rule);
    out
}

/// Console summary of a training run.
pub fn render_training_summary(report: &TrainingReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "🧠 TRAINING SUMMARY");
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(
        out,
        "Pairs:           {} train / {} validation",
        report.train_pairs, report.val_pairs
    );
    let _ = writeln!(
        out,
        "Epochs run:      {}{}",
        report.epochs_run,
        if report.stopped_early {
            " (early stop)"
        } else {
            ""
        }
    );
    let _ = writeln!(out, "Best epoch:      {}", report.best_epoch);
    let _ = writeln!(out, "Best val loss:   {:.6}", report.best_val_loss);
    let _ = writeln!(out, "Validation RMSE: ${:.2}", report.val_rmse);
    let _ = writeln!(out, "Validation MAE:  ${:.2}", report.val_mae);
    let _ = writeln!(out, "{}", "=".repeat(60));
    out
}
