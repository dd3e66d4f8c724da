//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data::filter::{Constraints, options_for};
use crate::data::model::{
    ACCIDENTAL, BRAND, CAR_TYPE, Dataset, FUEL_TYPE, FieldKind, KILOMETERS, Listing, MODEL_NAME,
    MODEL_VARIANT, OWNER, RECORD_SCHEMA, Record, STATE, TRANSMISSION, YEAR,
};
use crate::error::PredictError;
use crate::predict::forest::{
    ARTIFACT_FORMAT, ARTIFACT_VERSION, Aggregation, FeatureDef, ForestArtifact, ModelMetadata,
    NodeDef, SplitRuleDef, TargetTransform, TreeDef, UnknownLevel,
};
use crate::predict::handle::PriceModel;

fn car_type_of(model: &str) -> &'static str {
    match model {
        "Innova" => "MUV",
        "Swift" | "Baleno" => "Hatchback",
        _ => "Sedan",
    }
}

/// A listing with the given headline values and fixed filler for the rest.
pub fn listing(brand: &str, model: &str, year: i64, kilometers: i64, price: f64) -> Listing {
    let record = Record::new()
        .with(BRAND, brand)
        .with(MODEL_NAME, model)
        .with(MODEL_VARIANT, format!("{model} VX"))
        .with(CAR_TYPE, car_type_of(model))
        .with(OWNER, if year < 2015 { "Second" } else { "First" })
        .with(YEAR, year)
        .with(FUEL_TYPE, if kilometers > 50_000 { "Diesel" } else { "Petrol" })
        .with(TRANSMISSION, if price > 8.0 { "Automatic" } else { "Manual" })
        .with(STATE, if brand == "Honda" { "Delhi" } else { "Kerala" })
        .with(ACCIDENTAL, "No")
        .with(KILOMETERS, kilometers);
    Listing { record, price }
}

/// Six listings over three brands. Prices stay below the log-scale threshold.
pub fn sample_dataset() -> Dataset {
    Dataset::from_listings(vec![
        listing("Toyota", "Corolla", 2018, 40_000, 8.5),
        listing("Honda", "City", 2012, 90_000, 4.0),
        listing("Toyota", "Innova", 2021, 10_000, 18.0),
        listing("Maruti", "Swift", 2015, 55_000, 3.5),
        listing("Toyota", "Corolla", 2016, 60_000, 6.0),
        listing("Maruti", "Baleno", 2019, 20_000, 6.5),
    ])
    .expect("sample dataset is valid")
}

/// The first sample listing's record.
pub fn sample_record() -> Record {
    listing("Toyota", "Corolla", 2018, 40_000, 8.5).record
}

/// A small log-target forest over the full record schema, with levels taken
/// from [`sample_dataset`].
pub fn sample_artifact() -> ForestArtifact {
    let dataset = sample_dataset();
    let features = RECORD_SCHEMA
        .iter()
        .map(|spec| FeatureDef {
            name: spec.name.to_string(),
            kind: spec.kind,
            levels: match spec.kind {
                FieldKind::Categorical => options_for(&dataset, spec.name, &Constraints::new())
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                FieldKind::Integer => Vec::new(),
            },
            unknown: UnknownLevel::Error,
        })
        .collect();
    let feature_index = |name: &str| {
        RECORD_SCHEMA
            .iter()
            .position(|spec| spec.name == name)
            .expect("schema field")
    };

    let brand_tree = TreeDef {
        nodes: vec![
            NodeDef::Split {
                feature: feature_index(BRAND),
                rule: SplitRuleDef::InLevels {
                    levels: vec!["Toyota".to_string()],
                },
                left: 1,
                right: 2,
            },
            NodeDef::Leaf { value: 2.3 },
            NodeDef::Leaf { value: 1.5 },
        ],
    };
    let age_tree = TreeDef {
        nodes: vec![
            NodeDef::Split {
                feature: feature_index(YEAR),
                rule: SplitRuleDef::LessOrEqual { threshold: 2015.5 },
                left: 1,
                right: 2,
            },
            NodeDef::Leaf { value: 1.2 },
            NodeDef::Split {
                feature: feature_index(KILOMETERS),
                rule: SplitRuleDef::LessOrEqual { threshold: 50_000.0 },
                left: 3,
                right: 4,
            },
            NodeDef::Leaf { value: 2.2 },
            NodeDef::Leaf { value: 1.8 },
        ],
    };

    ForestArtifact {
        format: ARTIFACT_FORMAT.to_string(),
        version: ARTIFACT_VERSION,
        target: TargetTransform::Log,
        aggregation: Aggregation::Mean,
        base_score: 0.0,
        features,
        trees: vec![brand_tree, age_tree],
        metadata: ModelMetadata {
            algorithm: Some("Random Forest Regressor".to_string()),
            ..ModelMetadata::default()
        },
    }
}

/// Returns the same price for every record and counts its invocations.
#[derive(Debug)]
pub struct FixedPriceModel {
    price: f64,
    calls: AtomicUsize,
    last_batch_len: AtomicUsize,
}

impl FixedPriceModel {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            calls: AtomicUsize::new(0),
            last_batch_len: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_batch_len(&self) -> usize {
        self.last_batch_len.load(Ordering::SeqCst)
    }
}

impl PriceModel for FixedPriceModel {
    fn predict_batch(&self, records: &[Record]) -> Result<Vec<f64>, PredictError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_batch_len.store(records.len(), Ordering::SeqCst);
        Ok(vec![self.price; records.len()])
    }
}

/// Fails every call with the given error.
#[derive(Debug)]
pub struct FailingModel(pub PredictError);

impl PriceModel for FailingModel {
    fn predict_batch(&self, _records: &[Record]) -> Result<Vec<f64>, PredictError> {
        Err(self.0.clone())
    }
}
