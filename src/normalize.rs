use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::storage;

/// A string table with a fixed column order. Missing cells are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, name: &str) -> Option<&str> {
        let idx = self.column(name)?;
        self.rows.get(row)?.get(idx).map(|s| s.as_str())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        storage::write_atomic(path, |file| {
            let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
            writer
                .write_record(&self.columns)
                .context("write csv header")?;
            for row in &self.rows {
                writer.write_record(row).context("write csv row")?;
            }
            writer.flush().context("flush csv")?;
            Ok(())
        })
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("open {}", path.display()))?;
        let columns = reader
            .headers()
            .with_context(|| format!("read header of {}", path.display()))?
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("read row in {}", path.display()))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(Self { columns, rows })
    }
}

/// Flattens JSON objects into dotted columns (`fixture.venue.name`). Nested arrays stay as JSON
/// text, empty nested objects produce no column, and the column set is the union of all records
/// in first-seen order.
pub fn normalize_records(records: &[Value]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut flat_rows: Vec<Vec<(usize, String)>> = Vec::with_capacity(records.len());

    for record in records {
        let mut pairs = Vec::new();
        match record {
            Value::Object(obj) => flatten_object(obj, "", &mut pairs),
            other => pairs.push((String::new(), cell_text(other))),
        }

        let mut row = Vec::with_capacity(pairs.len());
        for (key, text) in pairs {
            let idx = *index.entry(key.clone()).or_insert_with(|| {
                columns.push(key);
                columns.len() - 1
            });
            row.push((idx, text));
        }
        flat_rows.push(row);
    }

    let width = columns.len();
    let rows = flat_rows
        .into_iter()
        .map(|pairs| {
            let mut row = vec![String::new(); width];
            for (idx, text) in pairs {
                row[idx] = text;
            }
            row
        })
        .collect();

    Table { columns, rows }
}

fn flatten_object(obj: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, value) in obj {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_object(inner, &name, out),
            other => out.push((name, cell_text(other))),
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
