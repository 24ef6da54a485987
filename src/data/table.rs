use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use arrow::array::{
    Array as ArrowArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::loader::FileLoader;
use super::model::{Array, Table};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Loader strategy
// ---------------------------------------------------------------------------

/// Reads numeric tables, dispatching on the file extension.
///
/// Supported formats:
/// * `.csv`     – header row, one numeric value per cell
/// * `.json`    – `[{ "a": 1.0, "b": 2.0 }, ...]` (records orientation)
/// * `.parquet` – numeric (int / float / bool) columns
///
/// Empty cells and JSON `null` become `NaN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableLoader;

impl FileLoader for TableLoader {
    type Output = Table;

    fn extensions(&self) -> &'static [&'static str] {
        &[".csv", ".json", ".parquet"]
    }

    fn load(&self, path: &Path) -> Result<Table> {
        load_table(path).map_err(|e| Error::Format(e.into()))
    }
}

fn load_table(path: &Path) -> anyhow::Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported table extension: .{other}"),
    }
}

/// Assemble a table from row-major cells.
fn build_table(columns: Vec<String>, cells: Vec<f64>) -> Table {
    let width = columns.len();
    let rows = if width == 0 { 0 } else { cells.len() / width };
    Table {
        columns,
        values: Array::new(vec![rows, width], cells),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> anyhow::Result<Table> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut cells = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != columns.len() {
            bail!(
                "CSV row {row_no}: {} fields but {} columns",
                record.len(),
                columns.len()
            );
        }
        for (col, value) in columns.iter().zip(record.iter()) {
            cells.push(parse_cell(value, row_no, col)?);
        }
    }

    Ok(build_table(columns, cells))
}

fn parse_cell(s: &str, row: usize, col: &str) -> anyhow::Result<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(f64::NAN);
    }
    match s {
        "true" => Ok(1.0),
        "false" => Ok(0.0),
        _ => s
            .parse::<f64>()
            .with_context(|| format!("Row {row}, column '{col}': '{s}' is not a number")),
    }
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the `df.to_json(orient='records')` layout.
/// Columns are taken from the first record.
fn load_json(path: &Path) -> anyhow::Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let columns: Vec<String> = match records.first() {
        Some(first) => first
            .as_object()
            .context("Row 0 is not a JSON object")?
            .keys()
            .cloned()
            .collect(),
        None => Vec::new(),
    };

    let mut cells = Vec::with_capacity(records.len() * columns.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for col in &columns {
            cells.push(json_to_f64(obj.get(col), i, col)?);
        }
    }

    Ok(build_table(columns, cells))
}

fn json_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> anyhow::Result<f64> {
    match val {
        None | Some(JsonValue::Null) => Ok(f64::NAN),
        Some(JsonValue::Bool(b)) => Ok(if *b { 1.0 } else { 0.0 }),
        Some(JsonValue::Number(n)) => n
            .as_f64()
            .with_context(|| format!("Row {row}, '{col}': number out of range")),
        Some(other) => bail!("Row {row}, '{col}': {other} is not a number"),
    }
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Non-numeric columns are rejected.
fn load_parquet(path: &Path) -> anyhow::Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut cells = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let numeric: Vec<Vec<f64>> = batch
            .columns()
            .iter()
            .zip(&columns)
            .map(|(col, name)| {
                extract_f64_column(col).with_context(|| format!("column '{name}'"))
            })
            .collect::<anyhow::Result<_>>()?;

        for row in 0..batch.num_rows() {
            cells.extend(numeric.iter().map(|col| col[row]));
        }
    }

    Ok(build_table(columns, cells))
}

/// Widen a numeric Arrow column to `f64`, nulls becoming `NaN`.
fn extract_f64_column(col: &Arc<dyn ArrowArray>) -> anyhow::Result<Vec<f64>> {
    let any = col.as_any();
    let values = match col.data_type() {
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect(),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .context("expected Float32Array")?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .iter()
            .map(|v| v.map_or(f64::NAN, |i| i as f64))
            .collect(),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect(),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .context("expected BooleanArray")?
            .iter()
            .map(|v| v.map_or(f64::NAN, |b| if b { 1.0 } else { 0.0 }))
            .collect(),
        other => bail!("Expected a numeric column, got {other:?}"),
    };
    Ok(values)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
