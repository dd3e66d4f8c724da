use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Startup / load errors
// ---------------------------------------------------------------------------

/// Failure to bring a dataset, model artifact or config file into memory.
///
/// At startup every variant is fatal: nothing in the dashboard works without
/// both the dataset and the model.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("failed to deserialize model {}: {reason}", path.display())]
    Deserialization { path: PathBuf, reason: String },

    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl LoadError {
    /// The file the failed load was pointed at.
    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        match self {
            LoadError::NotFound { path }
            | LoadError::Io { path, .. }
            | LoadError::Parse { path, .. }
            | LoadError::Deserialization { path, .. }
            | LoadError::Config { path, .. } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// Model-side errors
// ---------------------------------------------------------------------------

/// Failure raised by a loaded model while predicting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// The record's fields do not match the features the model was built on.
    #[error("record does not match model schema: {0}")]
    Schema(String),

    #[error("model inference failed: {0}")]
    Inference(String),
}

// ---------------------------------------------------------------------------
// User input errors
// ---------------------------------------------------------------------------

/// Rejected form input, caught before the model is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: String },

    #[error("{field} must be {expected}")]
    WrongKind {
        field: String,
        expected: &'static str,
    },

    #[error("unexpected field {field}")]
    UnexpectedField { field: String },

    #[error("Year must be between {min} and {max}, got {year}")]
    YearOutOfRange { year: i64, min: i64, max: i64 },

    #[error("Kilometers must be non-negative, got {kilometers}")]
    NegativeKilometers { kilometers: i64 },

    #[error("no {field} available for the current selection")]
    NoChoices { field: String },
}

/// Any per-request failure of the prediction flow. Always recoverable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Model(#[from] PredictError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display_includes_path() {
        let error = LoadError::NotFound {
            path: PathBuf::from("data/cars.csv"),
        };
        assert_eq!(error.to_string(), "file not found: data/cars.csv");
        assert_eq!(error.path(), std::path::Path::new("data/cars.csv"));
    }

    #[test]
    fn test_validation_messages_are_actionable() {
        let error = ValidationError::NegativeKilometers { kilometers: -5 };
        assert_eq!(error.to_string(), "Kilometers must be non-negative, got -5");

        let error = ValidationError::YearOutOfRange {
            year: 2009,
            min: 2010,
            max: 2023,
        };
        assert_eq!(
            error.to_string(),
            "Year must be between 2010 and 2023, got 2009"
        );
    }

    #[test]
    fn test_prediction_error_is_transparent() {
        let error: PredictionError = PredictError::Inference("boom".to_string()).into();
        assert_eq!(error.to_string(), "model inference failed: boom");

        let error: PredictionError = ValidationError::MissingField {
            field: "Brand".to_string(),
        }
        .into();
        assert_eq!(error.to_string(), "Brand is required");
    }
}
