use chrono::{Duration, TimeZone, Utc};
use pricecast::application::ml::Trainer;
use pricecast::domain::config::TrainingConfig;
use pricecast::domain::market::{PricePoint, PriceSeries};
use pricecast::domain::ml::LstmRegressor;
use pricecast::infrastructure::InMemoryBundleStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

fn wavy_series(n: usize) -> PriceSeries {
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    PriceSeries::new(
        (0..n)
            .map(|i| {
                let t = i as f64;
                PricePoint::new(
                    start + Duration::days(i as i64),
                    20_000.0 + 1_500.0 * (t * 0.25).sin() + 40.0 * t,
                )
            })
            .collect(),
    )
    .unwrap()
}

#[test]
fn test_halts_after_patience_without_improvement() {
    // lr 0 freezes the weights: epoch 1 is the only improvement
    let patience = 4;
    let config = TrainingConfig::new(5, 3, 6, 50, patience)
        .unwrap()
        .with_learning_rate(0.0)
        .with_seed(11);
    let store = Arc::new(InMemoryBundleStore::new());
    let trainer = Trainer::new(config, store.clone(), "mem://frozen").unwrap();

    let outcome = trainer.train(&wavy_series(40)).unwrap();
    let report = &outcome.report;

    assert_eq!(report.epochs_run, 1 + patience);
    assert!(report.stopped_early);
    assert_eq!(report.best_epoch, 1);
    assert_eq!(store.save_count(), 1);

    let initial = LstmRegressor::new(6, &mut StdRng::seed_from_u64(11));
    assert_eq!(&outcome.bundle.weights, initial.weights());
    assert_eq!(store.saved()[0], outcome.bundle);

    // every later epoch matched epoch 1 exactly
    for metrics in &report.history[1..] {
        assert_eq!(metrics.val_loss, report.history[0].val_loss);
    }
}

#[test]
fn test_runs_all_epochs_when_patience_exceeds_budget() {
    let config = TrainingConfig::new(5, 3, 6, 6, 10)
        .unwrap()
        .with_learning_rate(0.0);
    let store = Arc::new(InMemoryBundleStore::new());
    let trainer = Trainer::new(config, store.clone(), "mem://frozen").unwrap();

    let outcome = trainer.train(&wavy_series(30)).unwrap();
    assert_eq!(outcome.report.epochs_run, 6);
    assert!(!outcome.report.stopped_early);
    assert_eq!(store.save_count(), 1);
}

#[test]
fn test_learning_improves_on_initial_weights() {
    let config = TrainingConfig::new(5, 3, 8, 40, 40)
        .unwrap()
        .with_learning_rate(0.01);
    let store = Arc::new(InMemoryBundleStore::new());
    let trainer = Trainer::new(config, store.clone(), "mem://learning").unwrap();

    let outcome = trainer.train(&wavy_series(60)).unwrap();
    let first_val = outcome.report.history[0].val_loss;

    assert!(outcome.report.best_val_loss <= first_val);
    assert!(store.save_count() >= 1);
    assert_eq!(store.saved().last(), Some(&outcome.bundle));
}
