use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::transform::LogScaleHeuristic;
use crate::error::LoadError;

/// Looked up in the working directory at startup.
pub const CONFIG_FILE: &str = "car-price-dashboard.json";

/// Upper bound on `histogram_bins`; the bin counts are allocated up front.
pub const MAX_HISTOGRAM_BINS: usize = 1_000;

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Every field is optional in the file; missing ones take their default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub dataset_path: PathBuf,
    pub model_path: PathBuf,
    pub price_scale: LogScaleHeuristic,
    pub histogram_bins: usize,
    pub top_groups: usize,
    pub preview_rows: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("Car Sell Dataset.csv"),
            model_path: PathBuf::from("carsell_model.json"),
            price_scale: LogScaleHeuristic::default(),
            histogram_bins: 40,
            top_groups: 10,
            preview_rows: 5,
        }
    }
}

impl DashboardConfig {
    /// Read `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            log::info!("No {} found, using default configuration", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| LoadError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate().map_err(|reason| LoadError::Config {
            path: path.to_path_buf(),
            reason,
        })?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_HISTOGRAM_BINS).contains(&self.histogram_bins) {
            return Err(format!(
                "histogram_bins must be between 1 and {MAX_HISTOGRAM_BINS}, got {}",
                self.histogram_bins
            ));
        }
        if !self.price_scale.threshold.is_finite() {
            return Err("price_scale.threshold must be finite".to_string());
        }
        let clip = self.price_scale.clip_bound;
        if !clip.is_finite() || clip <= 0.0 {
            return Err(format!("price_scale.clip_bound must be positive, got {clip}"));
        }
        Ok(())
    }
}
