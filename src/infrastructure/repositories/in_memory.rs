//! In-memory store implementations.
//!
//! Used by tests and for offline runs where prices are already loaded.
//! Data is lost when the process exits.

use crate::domain::errors::ForecastError;
use crate::domain::market::{FetchOrder, InstrumentId, PriceSeries};
use crate::domain::ml::ModelBundle;
use crate::domain::ports::{BundleStore, PriceStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

/// In-memory implementation of PriceStore
pub struct InMemoryPriceStore {
    series: Arc<RwLock<HashMap<InstrumentId, PriceSeries>>>,
}

impl InMemoryPriceStore {
    pub fn new() -> Self {
        Self {
            series: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_series(instrument_id: InstrumentId, series: PriceSeries) -> Self {
        let mut map = HashMap::new();
        map.insert(instrument_id, series);
        Self {
            series: Arc::new(RwLock::new(map)),
        }
    }

    /// Replace the series held for `instrument_id`.
    pub async fn insert(&self, instrument_id: InstrumentId, series: PriceSeries) {
        self.series.write().await.insert(instrument_id, series);
    }
}

impl Default for InMemoryPriceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn fetch_series(
        &self,
        instrument_id: &InstrumentId,
        order: FetchOrder,
        limit: usize,
    ) -> Result<PriceSeries, ForecastError> {
        let map = self.series.read().await;
        let Some(series) = map.get(instrument_id) else {
            return PriceSeries::new(Vec::new());
        };

        let points = series.points();
        let take = limit.min(points.len());
        let slice = match order {
            FetchOrder::Earliest => &points[..take],
            FetchOrder::Latest => &points[points.len() - take..],
        };
        PriceSeries::new(slice.to_vec())
    }
}

/// In-memory implementation of BundleStore
///
/// Keeps the latest bundle per path plus every bundle ever saved, in order.
pub struct InMemoryBundleStore {
    bundles: Mutex<HashMap<PathBuf, ModelBundle>>,
    history: Mutex<Vec<ModelBundle>>,
}

impl InMemoryBundleStore {
    pub fn new() -> Self {
        Self {
            bundles: Mutex::new(HashMap::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Every bundle passed to `save`, oldest first.
    pub fn saved(&self) -> Vec<ModelBundle> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.history.lock().map(|h| h.len()).unwrap_or(0)
    }
}

impl Default for InMemoryBundleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleStore for InMemoryBundleStore {
    fn save(&self, bundle: &ModelBundle, path: &Path) -> Result<(), ForecastError> {
        self.bundles
            .lock()
            .map_err(|e| ForecastError::store(format!("bundle store lock poisoned: {}", e)))?
            .insert(path.to_path_buf(), bundle.clone());
        self.history
            .lock()
            .map_err(|e| ForecastError::store(format!("bundle store lock poisoned: {}", e)))?
            .push(bundle.clone());
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<ModelBundle, ForecastError> {
        let bundles = self
            .bundles
            .lock()
            .map_err(|e| ForecastError::store(format!("bundle store lock poisoned: {}", e)))?;
        let bundle = bundles
            .get(path)
            .cloned()
            .ok_or_else(|| ForecastError::model(format!("no bundle at {}", path.display())))?;
        bundle.validate()?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::PricePoint;
    use crate::domain::ml::{Hyperparameters, LstmWeights, MinMaxNormalizer};
    use chrono::{Duration, TimeZone, Utc};

    fn series(n: usize) -> PriceSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        PriceSeries::new(
            (0..n)
                .map(|i| PricePoint::new(start + Duration::days(i as i64), 1.0 + i as f64))
                .collect(),
        )
        .unwrap()
    }

    fn bundle(epoch: usize) -> ModelBundle {
        ModelBundle::new(
            Hyperparameters {
                seq_length: 3,
                prediction_steps: 2,
                hidden_size: 2,
            },
            MinMaxNormalizer { min: 1.0, max: 2.0 },
            LstmWeights::zeros(2),
            0.5 / epoch as f64,
            epoch,
        )
    }

    #[tokio::test]
    async fn test_fetch_orders_are_chronological() {
        let id = InstrumentId::random();
        let store = InMemoryPriceStore::with_series(id, series(6));

        let latest = store.fetch_series(&id, FetchOrder::Latest, 2).await.unwrap();
        assert_eq!(latest.closes(), vec![5.0, 6.0]);

        let earliest = store.fetch_series(&id, FetchOrder::Earliest, 2).await.unwrap();
        assert_eq!(earliest.closes(), vec![1.0, 2.0]);

        let all = store.fetch_series(&id, FetchOrder::Latest, 100).await.unwrap();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_unknown_instrument_is_empty() {
        let store = InMemoryPriceStore::new();
        let result = tokio_test::block_on(store.fetch_series(
            &InstrumentId::random(),
            FetchOrder::Latest,
            10,
        ))
        .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_bundle_store_keeps_latest_and_history() {
        let store = InMemoryBundleStore::new();
        let path = Path::new("models/a.json");
        store.save(&bundle(1), path).unwrap();
        store.save(&bundle(2), path).unwrap();

        assert_eq!(store.save_count(), 2);
        assert_eq!(store.load(path).unwrap().best_epoch, 2);
        assert_eq!(store.saved()[0].best_epoch, 1);
    }

    #[test]
    fn test_missing_bundle_is_model_not_loaded() {
        let store = InMemoryBundleStore::new();
        let err = store.load(Path::new("nowhere.json")).unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotLoaded { .. }));
    }
}
