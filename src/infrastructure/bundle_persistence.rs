//! JSON persistence for trained model bundles.
//!
//! Bundles are written atomically (temp file, then rename) so a crash while
//! checkpointing never leaves a truncated file behind. Floats round-trip
//! exactly.

use crate::domain::errors::ForecastError;
use crate::domain::ml::ModelBundle;
use crate::domain::ports::BundleStore;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBundleStore;

impl JsonBundleStore {
    pub fn new() -> Self {
        Self
    }
}

impl BundleStore for JsonBundleStore {
    fn save(&self, bundle: &ModelBundle, path: &Path) -> Result<(), ForecastError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                ForecastError::store(format!(
                    "Failed to create model directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = serde_json::to_string_pretty(bundle)
            .map_err(|e| ForecastError::store(format!("Failed to serialize bundle: {}", e)))?;

        // Atomic write: write to temp file then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)
            .map_err(|e| ForecastError::store(format!("Failed to write temp file: {}", e)))?;
        fs::rename(&temp_path, path)
            .map_err(|e| ForecastError::store(format!("Failed to rename temp file: {}", e)))?;

        debug!(
            "Saved bundle (epoch {}, val loss {:.6}) to {:?}",
            bundle.best_epoch, bundle.best_val_loss, path
        );
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<ModelBundle, ForecastError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ForecastError::model(format!("Failed to read bundle {}: {}", path.display(), e))
        })?;
        let bundle: ModelBundle = serde_json::from_str(&content).map_err(|e| {
            ForecastError::model(format!("Failed to parse bundle {}: {}", path.display(), e))
        })?;
        bundle.validate()?;

        info!(
            "Loaded model bundle from {:?} (hidden={}, seq={}, epoch {})",
            path,
            bundle.hyperparameters.hidden_size,
            bundle.hyperparameters.seq_length,
            bundle.best_epoch
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::InstrumentId;
    use crate::domain::ml::{Hyperparameters, LstmWeights, MinMaxNormalizer};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("pricecast_bundles_{}_{}", std::process::id(), n))
    }

    fn bundle() -> ModelBundle {
        let mut rng = StdRng::seed_from_u64(7);
        ModelBundle::new(
            Hyperparameters {
                seq_length: 10,
                prediction_steps: 5,
                hidden_size: 8,
            },
            MinMaxNormalizer {
                min: 15_432.17,
                max: 73_750.07,
            },
            LstmWeights::random(8, &mut rng),
            0.000_734_2,
            17,
        )
        .with_instrument(InstrumentId::random())
    }

    #[test]
    fn test_save_load_round_trip_is_exact() {
        let dir = temp_dir();
        let path = dir.join("models").join("btc_lstm.json");
        let store = JsonBundleStore::new();
        let original = bundle();

        store.save(&original, &path).unwrap();
        let loaded = store.load(&path).unwrap();
        assert_eq!(loaded, original);
        assert!(!path.with_extension("tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let dir = temp_dir();
        let path = dir.join("bundle.json");
        let store = JsonBundleStore::new();

        let mut first = bundle();
        first.best_epoch = 1;
        let mut second = bundle();
        second.best_epoch = 2;
        store.save(&first, &path).unwrap();
        store.save(&second, &path).unwrap();

        assert_eq!(store.load(&path).unwrap().best_epoch, 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_model_not_loaded() {
        let path = temp_dir().join("absent.json");
        let err = JsonBundleStore::new().load(&path).unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotLoaded { .. }));
    }

    #[test]
    fn test_corrupt_file_is_model_not_loaded() {
        let dir = temp_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrupt.json");
        fs::write(&path, "{ \"format_version\": 1, \"weights\": ").unwrap();

        let err = JsonBundleStore::new().load(&path).unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotLoaded { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_inconsistent_shapes_are_rejected() {
        let dir = temp_dir();
        let path = dir.join("bad_shape.json");
        let store = JsonBundleStore::new();

        let mut bad = bundle();
        bad.hyperparameters.hidden_size = 16;
        store.save(&bad, &path).unwrap();

        let err = store.load(&path).unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotLoaded { .. }));
        let _ = fs::remove_dir_all(&dir);
    }
}
