use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde_json::{Value, json};

const CSV_PATH: &str = "Car Sell Dataset.csv";
const PARQUET_PATH: &str = "car_sell_dataset.parquet";
const MODEL_PATH: &str = "carsell_model.json";

const ROWS: usize = 600;
const FIRST_YEAR: i64 = 2010;
const LAST_YEAR: i64 = 2023;

/// Log-price lost per year of age.
const AGE_PENALTY: f64 = 0.085;
const KM_BUCKETS: [(i64, f64); 4] = [
    (20_000, 0.05),
    (60_000, 0.0),
    (100_000, -0.08),
    (150_000, -0.16),
];
const KM_BEYOND: f64 = -0.25;

const OWNERS: [(&str, f64); 3] = [("First", 0.0), ("Second", -0.08), ("Third", -0.15)];
const FUELS: [(&str, f64); 3] = [("Petrol", 0.0), ("Diesel", 0.07), ("CNG", -0.05)];
const TRANSMISSIONS: [(&str, f64); 2] = [("Manual", 0.0), ("Automatic", 0.1)];
const STATES: [&str; 6] = [
    "Maharashtra",
    "Delhi",
    "Karnataka",
    "Kerala",
    "Tamil Nadu",
    "Gujarat",
];
const ACCIDENTAL: [(&str, f64); 2] = [("No", 0.0), ("Yes", -0.12)];

struct CarModel {
    brand: &'static str,
    name: &'static str,
    car_type: &'static str,
    variants: [&'static str; 2],
    /// New-car price in rupees.
    list_price: f64,
}

const fn car(
    brand: &'static str,
    name: &'static str,
    car_type: &'static str,
    variants: [&'static str; 2],
    list_price: f64,
) -> CarModel {
    CarModel {
        brand,
        name,
        car_type,
        variants,
        list_price,
    }
}

const CATALOGUE: [CarModel; 10] = [
    car("Maruti", "Swift", "Hatchback", ["LXI", "ZXI"], 700_000.0),
    car("Maruti", "Baleno", "Hatchback", ["Delta", "Alpha"], 820_000.0),
    car("Maruti", "Ertiga", "MUV", ["VXI", "ZXI Plus"], 1_050_000.0),
    car("Hyundai", "i20", "Hatchback", ["Sportz", "Asta"], 850_000.0),
    car("Hyundai", "Creta", "SUV", ["S", "SX(O)"], 1_500_000.0),
    car("Honda", "City", "Sedan", ["V", "ZX"], 1_300_000.0),
    car("Honda", "Amaze", "Sedan", ["S", "VX"], 800_000.0),
    car("Toyota", "Innova", "MUV", ["GX", "ZX"], 2_200_000.0),
    car("Toyota", "Fortuner", "SUV", ["4x2", "Legender"], 3_800_000.0),
    car("Mahindra", "XUV500", "SUV", ["W8", "W11"], 1_700_000.0),
];

const FEATURES: [(&str, &str); 11] = [
    ("Brand", "categorical"),
    ("Model Name", "categorical"),
    ("Model Variant", "categorical"),
    ("Car Type", "categorical"),
    ("Owner", "categorical"),
    ("Year", "integer"),
    ("Fuel Type", "categorical"),
    ("Transmission", "categorical"),
    ("State", "categorical"),
    ("Accidental", "categorical"),
    ("Kilometers", "integer"),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.below(items.len())]
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

struct Row {
    brand: &'static str,
    model: &'static str,
    variant: &'static str,
    car_type: &'static str,
    owner: &'static str,
    year: i64,
    fuel: &'static str,
    transmission: &'static str,
    state: &'static str,
    accidental: &'static str,
    kilometers: i64,
    price: f64,
}

fn km_effect(kilometers: i64) -> f64 {
    KM_BUCKETS
        .iter()
        .find(|(limit, _)| kilometers <= *limit)
        .map_or(KM_BEYOND, |(_, effect)| *effect)
}

fn generate_rows(rng: &mut SimpleRng) -> Vec<Row> {
    (0..ROWS)
        .map(|_| {
            let car = rng.pick(&CATALOGUE);
            let year = FIRST_YEAR + rng.below((LAST_YEAR - FIRST_YEAR + 1) as usize) as i64;
            let age = LAST_YEAR - year;
            let driven = age as f64 * 11_000.0 + rng.gauss(8_000.0, 6_000.0);
            let kilometers = driven.max(500.0) as i64;
            let (owner, owner_effect) = *rng.pick(&OWNERS);
            let (fuel, fuel_effect) = *rng.pick(&FUELS);
            let (transmission, transmission_effect) = *rng.pick(&TRANSMISSIONS);
            let (accidental, accident_effect) = if rng.next_f64() < 0.1 {
                ACCIDENTAL[1]
            } else {
                ACCIDENTAL[0]
            };

            let log_price = car.list_price.ln() - AGE_PENALTY * age as f64
                + km_effect(kilometers)
                + owner_effect
                + fuel_effect
                + transmission_effect
                + accident_effect
                + rng.gauss(0.0, 0.06);

            Row {
                brand: car.brand,
                model: car.name,
                variant: *rng.pick(&car.variants),
                car_type: car.car_type,
                owner,
                year,
                fuel,
                transmission,
                state: *rng.pick(&STATES),
                accidental,
                kilometers,
                price: (log_price.exp() / 1_000.0).round() * 1_000.0,
            }
        })
        .collect()
}

fn write_csv(rows: &[Row]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(CSV_PATH).with_context(|| format!("creating {CSV_PATH}"))?;
    writer.write_record(FEATURES.iter().map(|(name, _)| *name).chain(["Price"]))?;
    for row in rows {
        writer.write_record([
            row.brand.to_string(),
            row.model.to_string(),
            row.variant.to_string(),
            row.car_type.to_string(),
            row.owner.to_string(),
            row.year.to_string(),
            row.fuel.to_string(),
            row.transmission.to_string(),
            row.state.to_string(),
            row.accidental.to_string(),
            row.kilometers.to_string(),
            format!("{:.0}", row.price),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row]) -> Result<()> {
    let text = |f: fn(&Row) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let columns: Vec<ArrayRef> = vec![
        text(|r| r.brand),
        text(|r| r.model),
        text(|r| r.variant),
        text(|r| r.car_type),
        text(|r| r.owner),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.year).collect::<Vec<_>>())),
        text(|r| r.fuel),
        text(|r| r.transmission),
        text(|r| r.state),
        text(|r| r.accidental),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.kilometers).collect::<Vec<_>>())),
        Arc::new(Float64Array::from(rows.iter().map(|r| r.price).collect::<Vec<_>>())),
    ];

    let fields: Vec<Field> = FEATURES
        .iter()
        .map(|(name, kind)| {
            let data_type = if *kind == "integer" { DataType::Int64 } else { DataType::Utf8 };
            Field::new(*name, data_type, false)
        })
        .chain([Field::new("Price", DataType::Float64, false)])
        .collect();
    let schema = Arc::new(Schema::new(fields));

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = File::create(PARQUET_PATH).with_context(|| format!("creating {PARQUET_PATH}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Model artifact
// ---------------------------------------------------------------------------

/// A right-leaning chain of splits: each `(rule, value)` sends matching rows
/// to a leaf, everything else falls through to `otherwise`.
fn chain_tree(feature: usize, branches: &[(Value, f64)], otherwise: f64) -> Value {
    let mut nodes = Vec::new();
    for (i, (rule, value)) in branches.iter().enumerate() {
        let at = 2 * i;
        nodes.push(json!({
            "type": "split",
            "feature": feature,
            "rule": rule,
            "left": at + 1,
            "right": at + 2,
        }));
        nodes.push(json!({ "type": "leaf", "value": value }));
    }
    nodes.push(json!({ "type": "leaf", "value": otherwise }));
    json!({ "nodes": nodes })
}

fn in_level(level: &str) -> Value {
    json!({ "op": "in_levels", "levels": [level] })
}

fn feature_index(name: &str) -> usize {
    FEATURES.iter().position(|(n, _)| *n == name).unwrap_or_default()
}

fn levels_of(rows: &[Row], f: fn(&Row) -> &str) -> Vec<String> {
    let mut levels: Vec<String> = Vec::new();
    for row in rows {
        let value = f(row);
        if !levels.iter().any(|l| l == value) {
            levels.push(value.to_string());
        }
    }
    levels
}

fn table_tree(name: &str, table: &[(&str, f64)]) -> Value {
    let branches: Vec<(Value, f64)> = table
        .iter()
        .map(|(level, effect)| (in_level(level), *effect))
        .collect();
    chain_tree(feature_index(name), &branches, 0.0)
}

fn build_model(rows: &[Row]) -> Value {
    let base = CATALOGUE.iter().map(|c| c.list_price.ln()).sum::<f64>() / CATALOGUE.len() as f64;

    let model_branches: Vec<(Value, f64)> = CATALOGUE
        .iter()
        .map(|car| (in_level(car.name), car.list_price.ln() - base))
        .collect();
    let year_branches: Vec<(Value, f64)> = (FIRST_YEAR..LAST_YEAR)
        .map(|year| {
            let rule = json!({ "op": "less_or_equal", "threshold": year as f64 + 0.5 });
            (rule, -AGE_PENALTY * (LAST_YEAR - year) as f64)
        })
        .collect();
    let km_branches: Vec<(Value, f64)> = KM_BUCKETS
        .iter()
        .map(|(limit, effect)| {
            let rule = json!({ "op": "less_or_equal", "threshold": *limit as f64 });
            (rule, *effect)
        })
        .collect();

    let extractors: [fn(&Row) -> &str; 11] = [
        |r| r.brand,
        |r| r.model,
        |r| r.variant,
        |r| r.car_type,
        |r| r.owner,
        |_| "",
        |r| r.fuel,
        |r| r.transmission,
        |r| r.state,
        |r| r.accidental,
        |_| "",
    ];
    let features: Vec<Value> = FEATURES
        .iter()
        .zip(extractors)
        .map(|((name, kind), f)| {
            if *kind == "integer" {
                json!({ "name": name, "kind": kind })
            } else {
                json!({
                    "name": name,
                    "kind": kind,
                    "levels": levels_of(rows, f),
                    "unknown": "ignore",
                })
            }
        })
        .collect();

    json!({
        "format": "car-price-forest",
        "version": 1,
        "target": "log",
        "aggregation": "sum",
        "base_score": base,
        "features": features,
        "trees": [
            chain_tree(feature_index("Model Name"), &model_branches, 0.0),
            chain_tree(feature_index("Year"), &year_branches, 0.0),
            chain_tree(feature_index("Kilometers"), &km_branches, KM_BEYOND),
            table_tree("Owner", &OWNERS),
            table_tree("Fuel Type", &FUELS),
            table_tree("Transmission", &TRANSMISSIONS),
            table_tree("Accidental", &ACCIDENTAL),
        ],
        "metadata": {
            "algorithm": "Additive Regression Trees",
            "metrics": { "Training noise (log sd)": "0.06" },
            "notes": [
                "Synthetic model matching the sample dataset generator.",
                "Trained on the log of the selling price; predictions are exponentiated."
            ]
        }
    })
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let rows = generate_rows(&mut rng);

    write_csv(&rows)?;
    write_parquet(&rows)?;

    let model = build_model(&rows);
    let file = File::create(MODEL_PATH).with_context(|| format!("creating {MODEL_PATH}"))?;
    serde_json::to_writer_pretty(file, &model).context("writing model artifact")?;

    println!(
        "Wrote {} listings to {CSV_PATH} and {PARQUET_PATH}, model to {MODEL_PATH}",
        rows.len()
    );
    Ok(())
}
