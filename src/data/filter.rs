use std::collections::{BTreeMap, HashSet};

use super::model::{Dataset, FieldValue, Record};

// ---------------------------------------------------------------------------
// Cascading choices: which values a field may take given upstream picks
// ---------------------------------------------------------------------------

/// Already-fixed upstream fields: field_name → chosen value.
/// An empty map means "no constraint" (every row matches).
pub type Constraints = BTreeMap<String, FieldValue>;

/// Whether a row satisfies every constraint. A row lacking a constrained
/// field never matches.
fn matches(record: &Record, constraints: &Constraints) -> bool {
    constraints
        .iter()
        .all(|(field, wanted)| record.get(field) == Some(wanted))
}

/// Distinct values of `field` among rows matching `constraints`, in the order
/// they first appear in the dataset.
///
/// Empty when no row matches (or no matching row has the field).
pub fn options_for(dataset: &Dataset, field: &str, constraints: &Constraints) -> Vec<FieldValue> {
    let mut seen: HashSet<&FieldValue> = HashSet::new();
    let mut options = Vec::new();

    for listing in dataset.listings() {
        if !matches(&listing.record, constraints) {
            continue;
        }
        if let Some(value) = listing.record.get(field) {
            if seen.insert(value) {
                options.push(value.clone());
            }
        }
    }
    options
}
