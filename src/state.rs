use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::data::loader::DatasetStore;
use crate::data::model::{Dataset, FieldValue, Record};
use crate::data::summary::PriceOverview;
use crate::error::{LoadError, PredictionError, ValidationError};
use crate::form::PredictionForm;
use crate::predict::assembler::{InputBounds, Prediction, PredictionAssembler};
use crate::predict::handle::{ModelHandle, ModelStore};

pub const RETRY_HINT: &str = "Please ensure all inputs are correct and try again.";

// ---------------------------------------------------------------------------
// Views and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    DataInsights,
    AboutModel,
    Prediction,
}

impl View {
    pub const ALL: [View; 3] = [View::DataInsights, View::AboutModel, View::Prediction];

    pub fn label(self) -> &'static str {
        match self {
            View::DataInsights => "📊 Data Insights",
            View::AboutModel => "🧠 About Model",
            View::Prediction => "💰 Prediction",
        }
    }
}

/// Result of the last "Predict Price" click, as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Success { price: String, record: Record },
    Failure { message: String },
}

impl PredictionOutcome {
    fn from_result(result: Result<Prediction, PredictionError>) -> Self {
        match result {
            Ok(prediction) => PredictionOutcome::Success {
                price: prediction.formatted_price(),
                record: prediction.record,
            },
            Err(e) => {
                log::warn!("Prediction rejected: {e}");
                PredictionOutcome::Failure {
                    message: format!("Error in prediction: {e}"),
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Startup
// ---------------------------------------------------------------------------

/// Load the dataset, then the model. A dataset failure returns before the
/// model is touched.
pub fn load_resources(
    datasets: &mut DatasetStore,
    models: &mut ModelStore,
    config: &DashboardConfig,
) -> Result<(Arc<Dataset>, ModelHandle), LoadError> {
    let dataset = datasets.load(&config.dataset_path)?;
    let model = models.load(&config.model_path)?;
    Ok((dataset, model))
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,
    datasets: DatasetStore,
    models: ModelStore,

    /// Reference listings currently in use.
    pub dataset: Arc<Dataset>,
    pub dataset_path: PathBuf,

    pub model: ModelHandle,
    pub model_path: PathBuf,

    /// Validates form input against `dataset` and calls `model`.
    pub assembler: PredictionAssembler,

    /// Charts for the Data Insights view (rebuilt when the dataset changes).
    pub overview: PriceOverview,

    pub form: PredictionForm,

    pub view: View,

    pub outcome: Option<PredictionOutcome>,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    /// Load everything named by `config`. Any error here is fatal.
    pub fn start(config: DashboardConfig) -> Result<Self, LoadError> {
        let mut datasets = DatasetStore::default();
        let mut models = ModelStore::default();
        let (dataset, model) = load_resources(&mut datasets, &mut models, &config)?;
        Ok(Self::with_resources(config, datasets, models, dataset, model))
    }

    pub fn with_resources(
        config: DashboardConfig,
        datasets: DatasetStore,
        models: ModelStore,
        dataset: Arc<Dataset>,
        model: ModelHandle,
    ) -> Self {
        let overview = PriceOverview::compute(
            &dataset,
            &config.price_scale,
            config.histogram_bins,
            config.top_groups,
        );
        Self {
            assembler: PredictionAssembler::new(InputBounds::from_dataset(&dataset), model.clone()),
            form: PredictionForm::new(&dataset),
            overview,
            dataset_path: config.dataset_path.clone(),
            model_path: config.model_path.clone(),
            config,
            datasets,
            models,
            dataset,
            model,
            view: View::default(),
            outcome: None,
            status_message: None,
        }
    }

    /// Switch to another dataset file. On failure the current one stays.
    pub fn open_dataset(&mut self, path: &Path) {
        match self.datasets.load(path) {
            Ok(dataset) => {
                self.overview = PriceOverview::compute(
                    &dataset,
                    &self.config.price_scale,
                    self.config.histogram_bins,
                    self.config.top_groups,
                );
                self.form = PredictionForm::new(&dataset);
                self.assembler = PredictionAssembler::new(
                    InputBounds::from_dataset(&dataset),
                    self.model.clone(),
                );
                self.dataset = dataset;
                self.dataset_path = path.to_path_buf();
                self.outcome = None;
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to open dataset: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Switch to another model artifact. On failure the current one stays.
    pub fn open_model(&mut self, path: &Path) {
        match self.models.load(path) {
            Ok(model) => {
                self.assembler = PredictionAssembler::new(
                    InputBounds::from_dataset(&self.dataset),
                    model.clone(),
                );
                self.model = model;
                self.model_path = path.to_path_buf();
                self.outcome = None;
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to open model: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Change a dropdown; dependent dropdowns are re-narrowed.
    pub fn select(&mut self, field: &str, value: FieldValue) {
        let dataset = Arc::clone(&self.dataset);
        if self.form.select(&dataset, field, value) {
            self.outcome = None;
        }
    }

    /// Run the prediction for the current form. Never panics on bad input.
    pub fn submit_prediction(&mut self) {
        let result = match self.form.empty_choices().first() {
            Some(field) => Err(ValidationError::NoChoices {
                field: (*field).to_string(),
            }
            .into()),
            None => self.assembler.predict(&self.form.fields()),
        };
        self.outcome = Some(PredictionOutcome::from_result(result));
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::data::model::{BRAND, MODEL_NAME};
    use crate::predict::assembler::format_rupees;
    use crate::testing::{FixedPriceModel, listing, sample_artifact, sample_dataset};

    fn state_with(dataset: Dataset, model: Arc<FixedPriceModel>) -> AppState {
        AppState::with_resources(
            DashboardConfig::default(),
            DatasetStore::default(),
            ModelStore::default(),
            Arc::new(dataset),
            ModelHandle::new(model),
        )
    }

    #[test]
    fn test_end_to_end_prediction() {
        let dataset = Dataset::from_listings(vec![
            listing("Honda", "City", 2012, 90_000, 4.0),
            listing("Toyota", "Corolla", 2018, 40_000, 8.5),
        ])
        .unwrap();
        let model = Arc::new(FixedPriceModel::new(712_345.5));
        let mut state = state_with(dataset, model.clone());
        state.view = View::Prediction;

        state.select(BRAND, FieldValue::from("Toyota"));
        assert!(state.form.options(MODEL_NAME).contains(&FieldValue::from("Corolla")));
        state.select(MODEL_NAME, FieldValue::from("Corolla"));
        state.form.year = 2018;
        state.form.kilometers = 40_000;

        state.submit_prediction();

        assert_eq!(model.calls(), 1);
        assert_eq!(model.last_batch_len(), 1);
        match state.outcome {
            Some(PredictionOutcome::Success { price, record }) => {
                assert_eq!(price, format_rupees(712_345.5));
                assert_eq!(record.get(MODEL_NAME), Some(&FieldValue::from("Corolla")));
                assert_eq!(record.get("Year"), Some(&FieldValue::Integer(2018)));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_input_becomes_failure_message() {
        let model = Arc::new(FixedPriceModel::new(1.0));
        let mut state = state_with(sample_dataset(), model.clone());
        state.form.kilometers = -5;

        state.submit_prediction();

        assert_eq!(model.calls(), 0);
        assert_eq!(
            state.outcome,
            Some(PredictionOutcome::Failure {
                message: "Error in prediction: Kilometers must be non-negative, got -5".to_string()
            })
        );
    }

    #[test]
    fn test_empty_choice_blocks_submission() {
        let model = Arc::new(FixedPriceModel::new(1.0));
        let mut state = state_with(sample_dataset(), model.clone());
        state.form = PredictionForm::default();

        state.submit_prediction();

        assert_eq!(model.calls(), 0);
        assert!(matches!(state.outcome, Some(PredictionOutcome::Failure { .. })));
    }

    #[test]
    fn test_missing_dataset_stops_before_model() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("carsell_model.json");
        fs::write(&model_path, serde_json::to_string(&sample_artifact()).unwrap()).unwrap();
        let config = DashboardConfig {
            dataset_path: dir.path().join("missing.csv"),
            model_path,
            ..DashboardConfig::default()
        };

        let mut datasets = DatasetStore::default();
        let mut models = ModelStore::default();
        let err = load_resources(&mut datasets, &mut models, &config).unwrap_err();

        assert!(matches!(err, LoadError::NotFound { .. }));
        assert_eq!(err.path(), config.dataset_path.as_path());
        assert!(models.is_empty());
        assert!(AppState::start(config).is_err());
    }

    #[test]
    fn test_failed_reopen_keeps_current_dataset() {
        let mut state = state_with(sample_dataset(), Arc::new(FixedPriceModel::new(1.0)));
        let before = Arc::clone(&state.dataset);

        state.open_dataset(Path::new("/nonexistent/cars.csv"));

        assert!(Arc::ptr_eq(&before, &state.dataset));
        assert!(state.status_message.as_deref().unwrap_or("").contains("not found"));
    }

    #[test]
    fn test_changing_selection_clears_stale_outcome() {
        let mut state = state_with(sample_dataset(), Arc::new(FixedPriceModel::new(1.0)));
        state.submit_prediction();
        assert!(state.outcome.is_some());

        state.select(BRAND, FieldValue::from("Honda"));
        assert!(state.outcome.is_none());
    }

    #[test]
    fn test_reselecting_same_value_keeps_outcome() {
        let mut state = state_with(sample_dataset(), Arc::new(FixedPriceModel::new(1.0)));
        state.submit_prediction();
        let shown = state.outcome.clone();
        assert!(shown.is_some());

        state.select(BRAND, FieldValue::from("Toyota"));
        assert_eq!(state.outcome, shown);
    }
}
