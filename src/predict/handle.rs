use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::cache::PathCache;
use crate::data::model::Record;
use crate::error::{LoadError, PredictError};

use super::forest::ForestModel;

// ---------------------------------------------------------------------------
// PriceModel – the opaque prediction capability
// ---------------------------------------------------------------------------

/// Human-readable facts about a loaded model, for the description view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSummary {
    pub algorithm: Option<String>,
    pub target: String,
    pub feature_names: Vec<String>,
    pub trees: usize,
    pub metrics: BTreeMap<String, String>,
    pub notes: Vec<String>,
}

/// Maps structured records to prices in natural currency units.
///
/// Implementations are immutable after construction; `predict_batch` must
/// return exactly one price per input record.
pub trait PriceModel: Send + Sync {
    fn predict_batch(&self, records: &[Record]) -> Result<Vec<f64>, PredictError>;

    fn summary(&self) -> ModelSummary {
        ModelSummary::default()
    }
}

// ---------------------------------------------------------------------------
// ModelHandle – shared, read-only access to a loaded model
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ModelHandle {
    model: Arc<dyn PriceModel>,
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle").finish_non_exhaustive()
    }
}

impl ModelHandle {
    pub fn new(model: Arc<dyn PriceModel>) -> Self {
        Self { model }
    }

    /// Predict the price of a single record.
    pub fn predict(&self, record: &Record) -> Result<f64, PredictError> {
        let prices = self.model.predict_batch(std::slice::from_ref(record))?;
        match prices.as_slice() {
            [price] => Ok(*price),
            other => Err(PredictError::Inference(format!(
                "expected 1 prediction, model returned {}",
                other.len()
            ))),
        }
    }

    pub fn summary(&self) -> ModelSummary {
        self.model.summary()
    }
}

// ---------------------------------------------------------------------------
// ModelStore – load once per path
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ModelStore {
    cache: PathCache<ForestModel>,
}

impl ModelStore {
    /// Load the model artifact at `path`, or reuse the one loaded earlier.
    pub fn load(&mut self, path: &Path) -> Result<ModelHandle, LoadError> {
        let model = self.cache.get_or_try_load(path, |path| {
            let model = ForestModel::load(path)?;
            log::info!(
                "Loaded model from {} ({} trees, {} features)",
                path.display(),
                model.tree_count(),
                model.feature_count()
            );
            Ok(model)
        })?;
        Ok(ModelHandle::new(model))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedPriceModel, sample_record};

    struct TwoRowModel;

    impl PriceModel for TwoRowModel {
        fn predict_batch(&self, _records: &[Record]) -> Result<Vec<f64>, PredictError> {
            Ok(vec![1.0, 2.0])
        }
    }

    #[test]
    fn test_predict_sends_a_single_row() {
        let model = Arc::new(FixedPriceModel::new(850_000.0));
        let handle = ModelHandle::new(model.clone());

        let price = handle.predict(&sample_record()).unwrap();

        assert_eq!(price, 850_000.0);
        assert_eq!(model.calls(), 1);
        assert_eq!(model.last_batch_len(), 1);
    }

    #[test]
    fn test_wrong_row_count_is_inference_error() {
        let handle = ModelHandle::new(Arc::new(TwoRowModel));
        let err = handle.predict(&sample_record()).unwrap_err();
        assert!(matches!(err, PredictError::Inference(_)));
    }

    #[test]
    fn test_store_reports_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ModelStore::default();
        let err = store.load(&dir.path().join("model.json")).unwrap_err();
        assert!(matches!(err, LoadError::NotFound { .. }));
        assert!(store.is_empty());
    }
}
