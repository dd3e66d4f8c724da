use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::data::model::{Dataset, FieldValue, KILOMETERS, RECORD_SCHEMA, Record, YEAR, field_spec};
use crate::error::{PredictionError, ValidationError};

use super::handle::ModelHandle;

/// Flat form input: field_name → value.
pub type FormFields = BTreeMap<String, FieldValue>;

// ---------------------------------------------------------------------------
// Input bounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBounds {
    pub years: RangeInclusive<i64>,
}

impl InputBounds {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            years: dataset.year_range(),
        }
    }
}

// ---------------------------------------------------------------------------
// Prediction result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Natural currency units.
    pub price: f64,
    /// The exact record the model saw.
    pub record: Record,
}

impl Prediction {
    pub fn formatted_price(&self) -> String {
        format_rupees(self.price)
    }
}

/// `₹1,234,567.89`: two decimals, comma thousands separators.
pub fn format_rupees(value: f64) -> String {
    if !value.is_finite() {
        return format!("₹{value}");
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed.trim_start_matches(['0', '.']) != "" {
        "-"
    } else {
        ""
    };
    format!("{sign}₹{grouped}.{frac_part}")
}

// ---------------------------------------------------------------------------
// PredictionAssembler
// ---------------------------------------------------------------------------

/// Turns validated form input into a model record and a price.
#[derive(Debug, Clone)]
pub struct PredictionAssembler {
    bounds: InputBounds,
    model: ModelHandle,
}

impl PredictionAssembler {
    pub fn new(bounds: InputBounds, model: ModelHandle) -> Self {
        Self { bounds, model }
    }

    pub fn bounds(&self) -> &InputBounds {
        &self.bounds
    }

    /// Check `fields` against the record schema and bounds, and build the
    /// single record to send to the model.
    pub fn assemble(&self, fields: &FormFields) -> Result<Record, ValidationError> {
        let mut record = Record::new();
        for spec in &RECORD_SCHEMA {
            let value = fields
                .get(spec.name)
                .ok_or_else(|| ValidationError::MissingField {
                    field: spec.name.to_string(),
                })?;
            if value.kind() != spec.kind {
                return Err(ValidationError::WrongKind {
                    field: spec.name.to_string(),
                    expected: spec.kind.describe(),
                });
            }
            record.insert(spec.name, value.clone());
        }

        if let Some(name) = fields.keys().find(|name| field_spec(name).is_none()) {
            return Err(ValidationError::UnexpectedField {
                field: name.clone(),
            });
        }

        let year = record.get(YEAR).and_then(FieldValue::as_integer).unwrap_or_default();
        if !self.bounds.years.contains(&year) {
            return Err(ValidationError::YearOutOfRange {
                year,
                min: *self.bounds.years.start(),
                max: *self.bounds.years.end(),
            });
        }

        let kilometers = record
            .get(KILOMETERS)
            .and_then(FieldValue::as_integer)
            .unwrap_or_default();
        if kilometers < 0 {
            return Err(ValidationError::NegativeKilometers { kilometers });
        }

        Ok(record)
    }

    /// Validate, build the record and ask the model for its price.
    pub fn predict(&self, fields: &FormFields) -> Result<Prediction, PredictionError> {
        let record = self.assemble(fields)?;
        let price = self.model.predict(&record)?;
        log::info!("Predicted {} for [{record}]", format_rupees(price));
        Ok(Prediction { price, record })
    }
}
