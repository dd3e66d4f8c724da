use std::collections::BTreeMap;

use crate::data::filter::{Constraints, options_for};
use crate::data::model::{
    BRAND, CAR_TYPE, Dataset, FieldKind, FieldValue, KILOMETERS, MODEL_NAME, MODEL_VARIANT,
    RECORD_SCHEMA, YEAR,
};
use crate::predict::assembler::FormFields;

// ---------------------------------------------------------------------------
// Prediction form state
// ---------------------------------------------------------------------------

/// Fields whose choices are narrowed by the given upstream fields.
fn upstream_of(field: &str) -> &'static [&'static str] {
    match field {
        MODEL_NAME | MODEL_VARIANT | CAR_TYPE => &[BRAND],
        _ => &[],
    }
}

/// The categorical fields, in form order.
fn categorical_fields() -> impl Iterator<Item = &'static str> {
    RECORD_SCHEMA
        .iter()
        .filter(|spec| spec.kind == FieldKind::Categorical)
        .map(|spec| spec.name)
}

/// Current choices and selections for the eleven form inputs.
#[derive(Debug, Clone, Default)]
pub struct PredictionForm {
    options: BTreeMap<String, Vec<FieldValue>>,
    selections: BTreeMap<String, FieldValue>,
    pub year: i64,
    pub kilometers: i64,
}

impl PredictionForm {
    /// Every dropdown starts on its first choice, Year on the oldest year and
    /// Kilometers on zero.
    pub fn new(dataset: &Dataset) -> Self {
        let mut form = Self {
            year: *dataset.year_range().start(),
            kilometers: 0,
            ..Self::default()
        };
        for field in categorical_fields() {
            form.refresh(dataset, field);
        }
        form
    }

    pub fn options(&self, field: &str) -> &[FieldValue] {
        self.options.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn selected(&self, field: &str) -> Option<&FieldValue> {
        self.selections.get(field)
    }

    /// Pick `value` for `field` and re-narrow every dependent field.
    /// Returns whether the selection changed: `false` when `value` is not on
    /// offer or is already selected.
    pub fn select(&mut self, dataset: &Dataset, field: &str, value: FieldValue) -> bool {
        if !self.options(field).contains(&value) || self.selections.get(field) == Some(&value) {
            return false;
        }
        self.selections.insert(field.to_string(), value);

        for dependent in categorical_fields() {
            if upstream_of(dependent).iter().any(|up| *up == field) {
                self.refresh(dataset, dependent);
            }
        }
        true
    }

    /// Recompute one field's choices from its upstream selections. Keeps the
    /// current pick when it is still valid, else falls back to the first.
    fn refresh(&mut self, dataset: &Dataset, field: &str) {
        let constraints: Constraints = upstream_of(field)
            .iter()
            .filter_map(|up| {
                self.selections
                    .get(*up)
                    .map(|value| (up.to_string(), value.clone()))
            })
            .collect();
        let options = options_for(dataset, field, &constraints);

        let keep = self
            .selections
            .get(field)
            .filter(|current| options.contains(current))
            .cloned();
        match keep.or_else(|| options.first().cloned()) {
            Some(value) => {
                self.selections.insert(field.to_string(), value);
            }
            None => {
                log::warn!("No {field} choices for {constraints:?}");
                self.selections.remove(field);
            }
        }
        self.options.insert(field.to_string(), options);
    }

    /// Categorical fields currently left without any choice.
    pub fn empty_choices(&self) -> Vec<&'static str> {
        categorical_fields()
            .filter(|field| !self.selections.contains_key(*field))
            .collect()
    }

    pub fn can_submit(&self) -> bool {
        self.empty_choices().is_empty()
    }

    /// Snapshot of the form as flat named fields.
    pub fn fields(&self) -> FormFields {
        let mut fields: FormFields = self.selections.clone();
        fields.insert(YEAR.to_string(), FieldValue::Integer(self.year));
        fields.insert(KILOMETERS.to_string(), FieldValue::Integer(self.kilometers));
        fields
    }
}
