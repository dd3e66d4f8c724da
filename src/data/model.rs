use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Field names
// ---------------------------------------------------------------------------

pub const BRAND: &str = "Brand";
pub const MODEL_NAME: &str = "Model Name";
pub const MODEL_VARIANT: &str = "Model Variant";
pub const CAR_TYPE: &str = "Car Type";
pub const OWNER: &str = "Owner";
pub const YEAR: &str = "Year";
pub const FUEL_TYPE: &str = "Fuel Type";
pub const TRANSMISSION: &str = "Transmission";
pub const STATE: &str = "State";
pub const ACCIDENTAL: &str = "Accidental";
pub const KILOMETERS: &str = "Kilometers";
/// Target column; present in the dataset, never in a [`Record`].
pub const PRICE: &str = "Price";

// ---------------------------------------------------------------------------
// Record schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Categorical,
    Integer,
}

impl FieldKind {
    pub fn describe(self) -> &'static str {
        match self {
            FieldKind::Categorical => "text",
            FieldKind::Integer => "an integer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn categorical(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Categorical,
        }
    }

    const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
        }
    }
}

/// The eleven model inputs, in form / table display order.
pub const RECORD_SCHEMA: [FieldSpec; 11] = [
    FieldSpec::categorical(BRAND),
    FieldSpec::categorical(MODEL_NAME),
    FieldSpec::categorical(MODEL_VARIANT),
    FieldSpec::categorical(CAR_TYPE),
    FieldSpec::categorical(OWNER),
    FieldSpec::integer(YEAR),
    FieldSpec::categorical(FUEL_TYPE),
    FieldSpec::categorical(TRANSMISSION),
    FieldSpec::categorical(STATE),
    FieldSpec::categorical(ACCIDENTAL),
    FieldSpec::integer(KILOMETERS),
];

/// Look up a field of the record schema by name.
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    RECORD_SCHEMA.iter().find(|spec| spec.name == name)
}

// ---------------------------------------------------------------------------
// FieldValue – a single cell of a record
// ---------------------------------------------------------------------------

/// A record cell: text for categorical fields, integer for Year / Kilometers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Categorical,
            FieldValue::Integer(_) => FieldKind::Integer,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Integer(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Integer(i)
    }
}

// ---------------------------------------------------------------------------
// Record – one structured model input
// ---------------------------------------------------------------------------

/// Named field values describing one car.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    #[cfg(test)]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for Record {
    /// Schema fields first in display order, anything else after.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema_names = RECORD_SCHEMA.iter().map(|spec| spec.name);
        let extra_names = self
            .fields
            .keys()
            .map(String::as_str)
            .filter(|name| field_spec(name).is_none());

        let mut first = true;
        for name in schema_names.chain(extra_names) {
            let Some(value) = self.fields.get(name) else {
                continue;
            };
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Listing – one row of the reference dataset
// ---------------------------------------------------------------------------

/// A historical listing: the car's attributes plus its recorded price.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub record: Record,
    /// As stored in the file; may be natural units or log units.
    pub price: f64,
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded reference table
// ---------------------------------------------------------------------------

/// The parsed reference table. Immutable once built.
#[derive(Debug, Clone)]
pub struct Dataset {
    listings: Vec<Listing>,
    years: RangeInclusive<i64>,
}

impl Dataset {
    /// Build the dataset and derive the Year range. Fails on an empty table
    /// or a listing without an integer Year.
    pub fn from_listings(listings: Vec<Listing>) -> Result<Self, String> {
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        for (row, listing) in listings.iter().enumerate() {
            let year = listing
                .record
                .get(YEAR)
                .and_then(FieldValue::as_integer)
                .ok_or_else(|| format!("row {row}: missing integer {YEAR}"))?;
            min = min.min(year);
            max = max.max(year);
        }
        if listings.is_empty() {
            return Err("dataset has no rows".to_string());
        }
        Ok(Self {
            listings,
            years: min..=max,
        })
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// First `n` listings (fewer if the dataset is shorter).
    pub fn head(&self, n: usize) -> &[Listing] {
        &self.listings[..n.min(self.listings.len())]
    }

    /// Inclusive `min(Year)..=max(Year)`.
    pub fn year_range(&self) -> RangeInclusive<i64> {
        self.years.clone()
    }

    /// Copy of the Price column, in file order.
    pub fn prices(&self) -> Vec<f64> {
        self.listings.iter().map(|l| l.price).collect()
    }

    /// Values of one record field, in file order. Rows without it are skipped.
    #[cfg(test)]
    pub fn column<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.listings.iter().filter_map(move |l| l.record.get(field))
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::listing;

    #[test]
    fn test_schema_has_nine_categorical_and_two_integer_fields() {
        let integers: Vec<_> = RECORD_SCHEMA
            .iter()
            .filter(|spec| spec.kind == FieldKind::Integer)
            .map(|spec| spec.name)
            .collect();
        assert_eq!(integers, vec![YEAR, KILOMETERS]);
        assert_eq!(RECORD_SCHEMA.len() - integers.len(), 9);
        assert!(field_spec(PRICE).is_none());
    }

    #[test]
    fn test_year_range_is_derived_from_rows() {
        let dataset = Dataset::from_listings(vec![
            listing("Toyota", "Corolla", 2018, 40_000, 8.5),
            listing("Honda", "City", 2012, 90_000, 4.0),
            listing("Toyota", "Innova", 2021, 10_000, 18.0),
        ])
        .unwrap();
        assert_eq!(dataset.year_range(), 2012..=2021);
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.head(2).len(), 2);
        assert_eq!(dataset.head(10).len(), 3);
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let err = Dataset::from_listings(Vec::new()).unwrap_err();
        assert!(err.contains("no rows"));
    }

    #[test]
    fn test_record_display_follows_schema_order() {
        let record = Record::new()
            .with(YEAR, 2018)
            .with(BRAND, "Toyota")
            .with(KILOMETERS, 40_000);
        assert_eq!(record.to_string(), "Brand=Toyota, Year=2018, Kilometers=40000");
    }

    #[test]
    fn test_column_projects_in_file_order() {
        let dataset = Dataset::from_listings(vec![
            listing("Toyota", "Corolla", 2018, 40_000, 8.5),
            listing("Honda", "City", 2012, 90_000, 4.0),
        ])
        .unwrap();
        let brands: Vec<_> = dataset.column(BRAND).map(ToString::to_string).collect();
        assert_eq!(brands, vec!["Toyota", "Honda"]);
    }
}
