use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    ArrowPrimitiveType, DataType, Float32Type, Float64Type, Int32Type, Int64Type,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, FieldKind, FieldValue, Listing, PRICE, RECORD_SCHEMA, Record};
use crate::cache::PathCache;
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// DatasetStore – load once per path
// ---------------------------------------------------------------------------

/// Owns every dataset loaded so far, keyed by path.
#[derive(Debug, Default)]
pub struct DatasetStore {
    cache: PathCache<Dataset>,
}

impl DatasetStore {
    /// Load the dataset at `path`, or return the copy loaded earlier.
    pub fn load(&mut self, path: &Path) -> Result<Arc<Dataset>, LoadError> {
        self.cache.get_or_try_load(path, |path| {
            let dataset = load_file(path)?;
            log::info!(
                "Loaded {} listings from {} (years {:?})",
                dataset.len(),
                path.display(),
                dataset.year_range()
            );
            Ok(dataset)
        })
    }

    #[cfg(test)]
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.cache.contains(path)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a listings dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one listing per line
/// * `.json`    – `[{ "Brand": "...", ..., "Price": 8.5 }, ...]`
/// * `.parquet` – flat columns, one listing per row
///
/// Every format must carry the eleven record columns plus `Price`; any other
/// column is ignored.
pub fn load_file(path: &Path) -> Result<Dataset, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let parse_error = |e: anyhow::Error| LoadError::Parse {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    };

    let rows = read_rows(path).map_err(parse_error)?;
    let listings = rows
        .iter()
        .enumerate()
        .map(|(row_no, row)| listing_from_row(row_no, row))
        .collect::<Result<Vec<_>>>()
        .map_err(parse_error)?;

    Dataset::from_listings(listings).map_err(|reason| LoadError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => read_csv(path),
        "json" => read_json(path),
        "parquet" | "pq" => read_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Raw cells, before schema conversion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum RawCell {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

/// Required columns only: column_name → cell.
type RawRow = BTreeMap<String, RawCell>;

fn required_columns() -> impl Iterator<Item = &'static str> {
    RECORD_SCHEMA
        .iter()
        .map(|spec| spec.name)
        .chain(std::iter::once(PRICE))
}

fn listing_from_row(row_no: usize, row: &RawRow) -> Result<Listing> {
    let mut record = Record::new();
    for spec in &RECORD_SCHEMA {
        let cell = row.get(spec.name).unwrap_or(&RawCell::Null);
        let value = match spec.kind {
            FieldKind::Categorical => categorical_cell(cell),
            FieldKind::Integer => integer_cell(cell),
        }
        .with_context(|| format!("row {row_no}, column '{}'", spec.name))?;
        record.insert(spec.name, value);
    }

    let price = price_cell(row.get(PRICE).unwrap_or(&RawCell::Null))
        .with_context(|| format!("row {row_no}, column '{PRICE}'"))?;

    Ok(Listing { record, price })
}

fn categorical_cell(cell: &RawCell) -> Result<FieldValue> {
    match cell {
        RawCell::Text(s) => Ok(FieldValue::Text(s.clone())),
        RawCell::Integer(i) => Ok(FieldValue::Text(i.to_string())),
        RawCell::Float(f) => bail!("expected text, got number {f}"),
        RawCell::Null => bail!("missing value"),
    }
}

fn integer_cell(cell: &RawCell) -> Result<FieldValue> {
    let value = match cell {
        RawCell::Integer(i) => *i,
        RawCell::Float(f) => integral_float(*f)?,
        RawCell::Text(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => {
                    let f = s
                        .parse::<f64>()
                        .with_context(|| format!("'{s}' is not an integer"))?;
                    integral_float(f)?
                }
            }
        }
        RawCell::Null => bail!("missing value"),
    };
    Ok(FieldValue::Integer(value))
}

fn integral_float(f: f64) -> Result<i64> {
    if !f.is_finite() || f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
        bail!("{f} is not an integer");
    }
    Ok(f as i64)
}

fn price_cell(cell: &RawCell) -> Result<f64> {
    match cell {
        RawCell::Float(f) => Ok(*f),
        RawCell::Integer(i) => Ok(*i as f64),
        RawCell::Text(s) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("'{s}' is not a number")),
        RawCell::Null => bail!("missing value"),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one listing per record.
/// Empty cells are treated as missing.
fn read_csv(path: &Path) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();

    let columns: Vec<(usize, &'static str)> = required_columns()
        .map(|name| {
            headers
                .iter()
                .position(|h| h == name)
                .map(|idx| (idx, name))
                .with_context(|| format!("CSV missing '{name}' column"))
        })
        .collect::<Result<_>>()?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row = columns
            .iter()
            .map(|&(idx, name)| {
                let cell = match record.get(idx) {
                    Some("") | None => RawCell::Null,
                    Some(s) => RawCell::Text(s.to_string()),
                };
                (name.to_string(), cell)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// JSON reader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Brand": "Toyota", "Model Name": "Corolla", "Year": 2018, "Price": 8.5, ... },
///   ...
/// ]
/// ```
fn read_json(path: &Path) -> Result<Vec<RawRow>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            Ok(required_columns()
                .map(|name| {
                    let cell = obj.get(name).map_or(RawCell::Null, json_to_cell);
                    (name.to_string(), cell)
                })
                .collect())
        })
        .collect()
}

fn json_to_cell(val: &JsonValue) -> RawCell {
    match val {
        JsonValue::String(s) => RawCell::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                RawCell::Integer(i)
            } else if let Some(f) = n.as_f64() {
                RawCell::Float(f)
            } else {
                RawCell::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => RawCell::Text(b.to_string()),
        JsonValue::Null => RawCell::Null,
        other => RawCell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Text columns may be Utf8 or LargeUtf8, integer columns Int32 or Int64,
/// Price any float or integer type. Other column types (dictionary-encoded strings,
/// for instance) are cast to text first.
fn read_parquet(path: &Path) -> Result<Vec<RawRow>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let mut columns: Vec<(&'static str, Vec<RawCell>)> = Vec::new();
        for name in required_columns() {
            let idx = schema
                .index_of(name)
                .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
            let cells = column_cells(batch.column(idx))
                .with_context(|| format!("reading column '{name}'"))?;
            columns.push((name, cells));
        }

        for row in 0..batch.num_rows() {
            rows.push(
                columns
                    .iter()
                    .map(|(name, cells)| (name.to_string(), cells[row].clone()))
                    .collect(),
            );
        }
    }

    Ok(rows)
}

// -- Arrow helpers --

/// Convert a whole Arrow column into raw cells.
fn column_cells(col: &ArrayRef) -> Result<Vec<RawCell>> {
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col.as_string_opt::<i32>().context("expected Utf8 array")?;
            Ok(arr.iter().map(text_cell).collect())
        }
        DataType::LargeUtf8 => {
            let arr = col
                .as_string_opt::<i64>()
                .context("expected LargeUtf8 array")?;
            Ok(arr.iter().map(text_cell).collect())
        }
        DataType::Int32 => primitive_cells::<Int32Type>(col, |v| RawCell::Integer(i64::from(v))),
        DataType::Int64 => primitive_cells::<Int64Type>(col, RawCell::Integer),
        DataType::Float32 => primitive_cells::<Float32Type>(col, |v| RawCell::Float(f64::from(v))),
        DataType::Float64 => primitive_cells::<Float64Type>(col, RawCell::Float),
        other => {
            let cast = arrow::compute::cast(col.as_ref(), &DataType::Utf8)
                .with_context(|| format!("unsupported column type {other:?}"))?;
            column_cells(&cast)
        }
    }
}

fn text_cell(value: Option<&str>) -> RawCell {
    value.map_or(RawCell::Null, |s| RawCell::Text(s.to_string()))
}

fn primitive_cells<T: ArrowPrimitiveType>(
    col: &ArrayRef,
    wrap: impl Fn(T::Native) -> RawCell,
) -> Result<Vec<RawCell>> {
    let arr = col
        .as_primitive_opt::<T>()
        .with_context(|| format!("expected {:?} array", col.data_type()))?;
    Ok(arr.iter().map(|v| v.map_or(RawCell::Null, &wrap)).collect())
}
