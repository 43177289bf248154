//! LSTM trainer with early stopping.
//!
//! Flow: fit the normalizer on the whole series, cut it into
//! `(window, next)` pairs, split them in time order, then run one Adam step
//! per training pair each epoch. Every strict improvement in validation loss
//! is checkpointed through the `BundleStore` immediately; the last saved
//! checkpoint is the result.

use crate::application::ml::optimizer::Adam;
use crate::domain::config::TrainingConfig;
use crate::domain::errors::ForecastError;
use crate::domain::market::{InstrumentId, PriceSeries};
use crate::domain::ml::window::{self, TrainingPair};
use crate::domain::ml::{LstmRegressor, MinMaxNormalizer, ModelBundle};
use crate::domain::ports::BundleStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const LOG_EVERY_EPOCHS: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub epochs_run: usize,
    pub best_epoch: usize,
    pub best_val_loss: f64,
    pub stopped_early: bool,
    pub train_pairs: usize,
    pub val_pairs: usize,
    /// Validation RMSE of the best checkpoint, in price units
    pub val_rmse: f64,
    /// Validation MAE of the best checkpoint, in price units
    pub val_mae: f64,
    pub history: Vec<EpochMetrics>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub bundle: ModelBundle,
    pub report: TrainingReport,
}

pub struct Trainer {
    config: TrainingConfig,
    checkpoints: Arc<dyn BundleStore>,
    bundle_path: PathBuf,
    instrument_id: Option<InstrumentId>,
}

impl Trainer {
    pub fn new(
        config: TrainingConfig,
        checkpoints: Arc<dyn BundleStore>,
        bundle_path: impl Into<PathBuf>,
    ) -> Result<Self, ForecastError> {
        config.validate()?;
        Ok(Self {
            config,
            checkpoints,
            bundle_path: bundle_path.into(),
            instrument_id: None,
        })
    }

    /// Tag saved bundles with the instrument they were trained on.
    pub fn for_instrument(mut self, instrument_id: InstrumentId) -> Self {
        self.instrument_id = Some(instrument_id);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Minimum series length that yields one training and one validation pair.
    pub fn min_series_len(&self) -> usize {
        self.config.seq_length + window::min_pairs_for_split(self.config.train_split)
    }

    pub fn train(&self, series: &PriceSeries) -> Result<TrainingOutcome, ForecastError> {
        let cfg = &self.config;
        let required = self.min_series_len();
        if series.len() < required {
            return Err(ForecastError::InsufficientData {
                required,
                available: series.len(),
            });
        }

        let closes = series.closes();
        let normalizer = MinMaxNormalizer::fit(&closes)?;
        let normalized = normalizer.normalize_all(&closes);

        let pairs = window::supervised_pairs(&normalized, cfg.seq_length);
        let split = window::split_index(pairs.len(), cfg.train_split);
        let (train, val) = pairs.split_at(split);
        if train.is_empty() || val.is_empty() {
            return Err(ForecastError::InsufficientData {
                required,
                available: series.len(),
            });
        }

        info!(
            "Training LSTM (hidden={}, seq={}) on {} pairs, validating on {}",
            cfg.hidden_size,
            cfg.seq_length,
            train.len(),
            val.len()
        );

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut model = LstmRegressor::new(cfg.hidden_size, &mut rng);
        let mut optimizer = Adam::new(cfg.learning_rate, cfg.hidden_size);

        let mut history = Vec::with_capacity(cfg.epochs);
        let mut best: Option<ModelBundle> = None;
        let mut best_val_loss = f64::INFINITY;
        let mut epochs_without_improvement = 0;
        let mut stopped_early = false;

        for epoch in 1..=cfg.epochs {
            let train_loss = self.train_epoch(&mut model, &mut optimizer, train, epoch)?;
            let val_loss = mean_loss(&model, val);
            if !val_loss.is_finite() {
                return Err(ForecastError::Divergence {
                    epoch,
                    loss: val_loss,
                });
            }

            history.push(EpochMetrics {
                epoch,
                train_loss,
                val_loss,
            });

            if epoch % LOG_EVERY_EPOCHS == 0 {
                info!(
                    "Epoch {}/{} - Loss: {:.6} - Val Loss: {:.6}",
                    epoch, cfg.epochs, train_loss, val_loss
                );
            } else {
                debug!(
                    "Epoch {}/{} - Loss: {:.6} - Val Loss: {:.6}",
                    epoch, cfg.epochs, train_loss, val_loss
                );
            }

            if val_loss < best_val_loss {
                best_val_loss = val_loss;
                epochs_without_improvement = 0;

                let bundle = self.checkpoint(&model, normalizer, val_loss, epoch);
                self.checkpoints.save(&bundle, &self.bundle_path)?;
                debug!("Checkpoint saved at epoch {} (val loss {:.6})", epoch, val_loss);
                best = Some(bundle);
            } else {
                epochs_without_improvement += 1;
                if epochs_without_improvement >= cfg.patience {
                    info!(
                        "Early stopping at epoch {}: no improvement for {} epochs",
                        epoch, cfg.patience
                    );
                    stopped_early = true;
                    break;
                }
            }
        }

        let bundle = best.ok_or(ForecastError::Divergence {
            epoch: history.len(),
            loss: best_val_loss,
        })?;

        let (val_rmse, val_mae) = price_errors(&bundle, val)?;
        info!(
            "Training finished after {} epochs: best epoch {} (val loss {:.6}, RMSE {:.2}, MAE {:.2})",
            history.len(),
            bundle.best_epoch,
            bundle.best_val_loss,
            val_rmse,
            val_mae
        );

        let report = TrainingReport {
            epochs_run: history.len(),
            best_epoch: bundle.best_epoch,
            best_val_loss: bundle.best_val_loss,
            stopped_early,
            train_pairs: train.len(),
            val_pairs: val.len(),
            val_rmse,
            val_mae,
            history,
        };

        Ok(TrainingOutcome { bundle, report })
    }

    fn train_epoch(
        &self,
        model: &mut LstmRegressor,
        optimizer: &mut Adam,
        pairs: &[TrainingPair],
        epoch: usize,
    ) -> Result<f64, ForecastError> {
        let mut total = 0.0;
        for pair in pairs {
            let (loss, mut grads) = model.loss_and_gradients(&pair.input, pair.target);
            if !loss.is_finite() {
                return Err(ForecastError::Divergence { epoch, loss });
            }
            grads.clip_norm(self.config.grad_clip_norm);
            optimizer.step(model.weights_mut(), &grads);
            total += loss;
        }
        Ok(total / pairs.len() as f64)
    }

    fn checkpoint(
        &self,
        model: &LstmRegressor,
        normalizer: MinMaxNormalizer,
        val_loss: f64,
        epoch: usize,
    ) -> ModelBundle {
        let bundle = ModelBundle::new(
            self.config.hyperparameters(),
            normalizer,
            model.weights().clone(),
            val_loss,
            epoch,
        );
        match self.instrument_id {
            Some(id) => bundle.with_instrument(id),
            None => bundle,
        }
    }
}

fn mean_loss(model: &LstmRegressor, pairs: &[TrainingPair]) -> f64 {
    pairs
        .iter()
        .map(|p| model.loss(&p.input, p.target))
        .sum::<f64>()
        / pairs.len() as f64
}

/// RMSE and MAE of a bundle's predictions on `pairs`, denormalized.
fn price_errors(bundle: &ModelBundle, pairs: &[TrainingPair]) -> Result<(f64, f64), ForecastError> {
    let model = bundle.regressor()?;
    let n = pairs.len() as f64;
    let mut sq = 0.0;
    let mut abs = 0.0;
    for pair in pairs {
        let predicted = bundle.normalizer.denormalize(model.forward(&pair.input));
        let actual = bundle.normalizer.denormalize(pair.target);
        sq += (predicted - actual).powi(2);
        abs += (predicted - actual).abs();
    }
    Ok(((sq / n).sqrt(), abs / n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::InMemoryBundleStore;
    use crate::domain::market::PricePoint;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(start + Duration::days(i as i64), *c))
                .collect(),
        )
        .unwrap()
    }

    fn small_config() -> TrainingConfig {
        TrainingConfig::new(4, 3, 6, 20, 3)
            .unwrap()
            .with_learning_rate(0.01)
    }

    #[test]
    fn test_rejects_series_without_validation_pair() {
        let store = Arc::new(InMemoryBundleStore::new());
        let trainer = Trainer::new(small_config(), store, "mem://bundle").unwrap();

        // seq 4 + 1 = one pair, nothing left to validate on
        let result = trainer.train(&series(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert!(matches!(
            result,
            Err(ForecastError::InsufficientData {
                required: 6,
                available: 5
            })
        ));
    }

    #[test]
    fn test_minimal_series_trains() {
        let store = Arc::new(InMemoryBundleStore::new());
        let trainer = Trainer::new(small_config(), store, "mem://bundle").unwrap();

        let outcome = trainer
            .train(&series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]))
            .unwrap();
        assert_eq!(outcome.report.train_pairs, 1);
        assert_eq!(outcome.report.val_pairs, 1);
    }

    #[test]
    fn test_split_preserves_time_order() {
        let closes: Vec<f64> = (0..24).map(|i| 100.0 + i as f64).collect();
        let store = Arc::new(InMemoryBundleStore::new());
        let trainer = Trainer::new(small_config(), store, "mem://bundle").unwrap();

        let outcome = trainer.train(&series(&closes)).unwrap();
        // 24 - 4 = 20 pairs, 80/20
        assert_eq!(outcome.report.train_pairs, 16);
        assert_eq!(outcome.report.val_pairs, 4);
    }

    #[test]
    fn test_returned_bundle_is_last_checkpoint() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 100.0 + 10.0 * (i as f64 * 0.4).sin())
            .collect();
        let store = Arc::new(InMemoryBundleStore::new());
        let trainer = Trainer::new(small_config(), store.clone(), "mem://bundle").unwrap();

        let outcome = trainer.train(&series(&closes)).unwrap();
        let saved = store.saved();

        assert!(!saved.is_empty());
        assert_eq!(saved.last().unwrap(), &outcome.bundle);
        assert_eq!(outcome.report.best_epoch, outcome.bundle.best_epoch);

        // every checkpoint strictly improves on the one before
        for pair in saved.windows(2) {
            assert!(pair[1].best_val_loss < pair[0].best_val_loss);
            assert!(pair[1].best_epoch > pair[0].best_epoch);
        }
    }

    #[test]
    fn test_history_matches_epochs_run() {
        let closes: Vec<f64> = (0..30).map(|i| 50.0 + (i % 7) as f64).collect();
        let store = Arc::new(InMemoryBundleStore::new());
        let trainer = Trainer::new(small_config(), store, "mem://bundle").unwrap();

        let outcome = trainer.train(&series(&closes)).unwrap();
        let report = &outcome.report;
        assert_eq!(report.history.len(), report.epochs_run);
        assert!(report.epochs_run <= 20);
        assert_eq!(
            report.best_val_loss,
            report
                .history
                .iter()
                .map(|m| m.val_loss)
                .fold(f64::INFINITY, f64::min)
        );
        assert!(report.val_rmse >= 0.0);
        assert!(report.val_mae <= report.val_rmse + 1e-9);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + (i as f64).sqrt()).collect();
        let run = || {
            let store = Arc::new(InMemoryBundleStore::new());
            Trainer::new(small_config(), store, "mem://bundle")
                .unwrap()
                .train(&series(&closes))
                .unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.bundle.weights, b.bundle.weights);
        assert_eq!(a.report.history, b.report.history);
    }

    #[test]
    fn test_instrument_tag_is_recorded() {
        let id = InstrumentId::random();
        let store = Arc::new(InMemoryBundleStore::new());
        let trainer = Trainer::new(small_config(), store, "mem://bundle")
            .unwrap()
            .for_instrument(id);

        let closes: Vec<f64> = (0..12).map(|i| 1.0 + i as f64).collect();
        let outcome = trainer.train(&series(&closes)).unwrap();
        assert_eq!(outcome.bundle.instrument_id, Some(id));
    }

    #[test]
    fn test_exploding_updates_stop_with_divergence() {
        let store = Arc::new(InMemoryBundleStore::new());
        let config = small_config().with_learning_rate(1e308);
        let trainer = Trainer::new(config, store.clone(), "mem://bundle").unwrap();

        let closes: Vec<f64> = (0..12).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        match trainer.train(&series(&closes)) {
            Err(ForecastError::Divergence { epoch, loss }) => {
                assert_eq!(epoch, 1);
                assert!(!loss.is_finite());
            }
            other => panic!("expected divergence, got {:?}", other.map(|o| o.report)),
        }
        assert_eq!(store.save_count(), 0);
    }
}
