//! Store-backed training and forecasting flows.
//!
//! The only awaits are price fetches; training and rollout run synchronously
//! in between.

use crate::application::ml::{Forecaster, Trainer, TrainingOutcome};
use crate::application::reporting::ForecastReport;
use crate::domain::config::{SignalConfig, TrainingConfig};
use crate::domain::errors::ForecastError;
use crate::domain::market::{FetchOrder, InstrumentId};
use crate::domain::ports::{BundleStore, PriceStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub struct TrainingPipeline {
    prices: Arc<dyn PriceStore>,
    bundles: Arc<dyn BundleStore>,
    bundle_path: PathBuf,
    instrument_id: InstrumentId,
    history_limit: usize,
}

impl TrainingPipeline {
    pub fn new(
        prices: Arc<dyn PriceStore>,
        bundles: Arc<dyn BundleStore>,
        bundle_path: impl Into<PathBuf>,
        instrument_id: InstrumentId,
        history_limit: usize,
    ) -> Self {
        Self {
            prices,
            bundles,
            bundle_path: bundle_path.into(),
            instrument_id,
            history_limit,
        }
    }

    /// Train on the most recent `history_limit` closes of the instrument.
    pub async fn run(&self, config: TrainingConfig) -> Result<TrainingOutcome, ForecastError> {
        let series = self
            .prices
            .fetch_series(&self.instrument_id, FetchOrder::Latest, self.history_limit)
            .await?;
        info!(
            "Loaded {} closes for {} ({} .. {})",
            series.len(),
            self.instrument_id,
            series
                .first()
                .map(|p| p.timestamp.date_naive().to_string())
                .unwrap_or_default(),
            series
                .last()
                .map(|p| p.timestamp.date_naive().to_string())
                .unwrap_or_default()
        );

        let trainer = Trainer::new(config, self.bundles.clone(), self.bundle_path.clone())?
            .for_instrument(self.instrument_id);
        let outcome = trainer.train(&series)?;
        info!("Model bundle saved to {}", self.bundle_path.display());
        Ok(outcome)
    }
}

pub struct ForecastPipeline {
    prices: Arc<dyn PriceStore>,
    bundles: Arc<dyn BundleStore>,
    bundle_path: PathBuf,
    instrument_id: InstrumentId,
    history_margin: usize,
}

impl ForecastPipeline {
    pub fn new(
        prices: Arc<dyn PriceStore>,
        bundles: Arc<dyn BundleStore>,
        bundle_path: impl Into<PathBuf>,
        instrument_id: InstrumentId,
        history_margin: usize,
    ) -> Self {
        Self {
            prices,
            bundles,
            bundle_path: bundle_path.into(),
            instrument_id,
            history_margin,
        }
    }

    /// Load the bundle, fetch the latest closes and forecast from them.
    pub async fn run(&self, signal: SignalConfig) -> Result<ForecastReport, ForecastError> {
        let bundle = self.bundles.load(&self.bundle_path)?;
        if let Some(trained_on) = bundle.instrument_id
            && trained_on != self.instrument_id
        {
            warn!(
                "Bundle was trained on {}, forecasting {}",
                trained_on, self.instrument_id
            );
        }

        let reference = signal.reference;
        let forecaster = Forecaster::from_bundle(&bundle, signal)?;

        // one extra close for the yesterday anchor
        let limit = forecaster.seq_length() + 1 + self.history_margin;
        let series = self
            .prices
            .fetch_series(&self.instrument_id, FetchOrder::Latest, limit)
            .await?;

        let forecast = forecaster.forecast(&series)?;
        info!(
            "{} forecast for {}: {} ({:+.2}% average)",
            forecaster.predictor_name(),
            self.instrument_id,
            forecast.trend.trend,
            forecast.trend.average_change
        );

        Ok(ForecastReport::new(
            &forecast,
            &bundle,
            forecaster.predictor_name(),
            reference,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::{InMemoryBundleStore, InMemoryPriceStore};
    use crate::domain::market::{PricePoint, PriceSeries};
    use chrono::{Duration, TimeZone, Utc};

    fn seeded_prices(id: InstrumentId, n: usize) -> Arc<InMemoryPriceStore> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let points = (0..n)
            .map(|i| {
                PricePoint::new(
                    start + Duration::days(i as i64),
                    30_000.0 + 500.0 * (i as f64 * 0.3).sin(),
                )
            })
            .collect();
        Arc::new(InMemoryPriceStore::with_series(
            id,
            PriceSeries::new(points).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_train_then_forecast() {
        let id = InstrumentId::random();
        let prices = seeded_prices(id, 60);
        let bundles = Arc::new(InMemoryBundleStore::new());

        let training = TrainingPipeline::new(prices.clone(), bundles.clone(), "mem://btc", id, 365);
        let config = TrainingConfig::new(5, 3, 4, 5, 2).unwrap();
        let outcome = training.run(config).await.unwrap();
        assert_eq!(outcome.bundle.instrument_id, Some(id));

        let forecasting = ForecastPipeline::new(prices, bundles, "mem://btc", id, 2);
        let report = forecasting.run(SignalConfig::default()).await.unwrap();
        assert!(report.success);
        assert_eq!(report.predictions.len(), 3);
        assert_eq!(report.model_info.sequence_length, 5);
    }

    #[tokio::test]
    async fn test_training_uses_most_recent_history() {
        let id = InstrumentId::random();
        let start = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let points = (0..1095)
            .map(|i| {
                let level = if i < 730 { 7_000.0 } else { 60_000.0 };
                PricePoint::new(
                    start + Duration::days(i as i64),
                    level + 30.0 * (i as f64 * 0.2).sin(),
                )
            })
            .collect();
        let prices = Arc::new(InMemoryPriceStore::with_series(
            id,
            PriceSeries::new(points).unwrap(),
        ));
        let bundles = Arc::new(InMemoryBundleStore::new());

        let training = TrainingPipeline::new(prices, bundles, "mem://btc", id, 365);
        let config = TrainingConfig::new(5, 3, 4, 2, 1).unwrap();
        let outcome = training.run(config).await.unwrap();

        let normalizer = outcome.bundle.normalizer;
        assert!(normalizer.min >= 59_900.0, "min was {}", normalizer.min);
        assert!(normalizer.max >= 60_000.0, "max was {}", normalizer.max);
        assert_eq!(outcome.report.train_pairs + outcome.report.val_pairs, 360);
    }

    #[tokio::test]
    async fn test_forecast_without_bundle_fails() {
        let id = InstrumentId::random();
        let forecasting = ForecastPipeline::new(
            seeded_prices(id, 20),
            Arc::new(InMemoryBundleStore::new()),
            "mem://missing",
            id,
            0,
        );
        let err = forecasting.run(SignalConfig::default()).await.unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotLoaded { .. }));
    }

    #[tokio::test]
    async fn test_training_unknown_instrument_has_no_data() {
        let prices = seeded_prices(InstrumentId::random(), 20);
        let training = TrainingPipeline::new(
            prices,
            Arc::new(InMemoryBundleStore::new()),
            "mem://btc",
            InstrumentId::random(),
            365,
        );
        let err = training.run(TrainingConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData { available: 0, .. }
        ));
    }
}
