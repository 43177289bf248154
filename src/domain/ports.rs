use crate::domain::errors::ForecastError;
use crate::domain::market::{FetchOrder, InstrumentId, PriceSeries};
use crate::domain::ml::ModelBundle;
use async_trait::async_trait;
use std::path::Path;

/// Source of historical closes.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Up to `limit` closes for `instrument_id`, taken from the end selected
    /// by `order` and returned oldest first.
    async fn fetch_series(
        &self,
        instrument_id: &InstrumentId,
        order: FetchOrder,
        limit: usize,
    ) -> Result<PriceSeries, ForecastError>;
}

/// Persistence for trained model bundles.
///
/// Synchronous: checkpoints are written from inside the training loop.
pub trait BundleStore: Send + Sync {
    fn save(&self, bundle: &ModelBundle, path: &Path) -> Result<(), ForecastError>;

    /// Fails with `ModelNotLoaded` when the bundle is missing or corrupt.
    fn load(&self, path: &Path) -> Result<ModelBundle, ForecastError>;
}
