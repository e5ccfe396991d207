// RiskWatch Exporter - HTTP ingestion and Prometheus exporter
// Copyright (c) 2025 David Martin Venti
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Reference data loading.
//!
//! Reads a CSV file with a header row into a [`Table`], drops rows outside the
//! configured ranges and applies unit conversions.

use riskwatch::{Record, Scalar, Table};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Inclusive numeric range a column must fall in.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowFilter {
    pub column: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl RowFilter {
    /// Rows with a missing or non-numeric value fail the filter.
    pub fn accepts(&self, record: &Record) -> bool {
        match record.get(&self.column).and_then(Scalar::as_f64) {
            Some(v) => {
                self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max)
            }
            None => false,
        }
    }
}

/// Unit conversions applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    FahrenheitToCelsius,
}

impl TransformKind {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            TransformKind::FahrenheitToCelsius => (value - 32.0) * 5.0 / 9.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transform {
    pub column: String,
    pub kind: TransformKind,
}

impl Transform {
    /// Convert the column in place; non-numeric cells are left as they are.
    pub fn apply(&self, record: &mut Record) {
        if let Some(cell) = record.get_mut(&self.column) {
            if let Some(v) = cell.as_f64() {
                *cell = Scalar::Number(self.kind.apply(v));
            }
        }
    }
}

/// Reference loading errors.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Load a reference table from a CSV file.
pub fn load(
    path: &Path,
    filters: &[RowFilter],
    transforms: &[Transform],
) -> Result<Table, ReferenceError> {
    if !path.exists() {
        return Err(ReferenceError::FileNotFound(path.display().to_string()));
    }

    let reader = csv::Reader::from_path(path)?;
    let mut table = parse(reader)?;
    let loaded = table.len();

    table.retain(|record| filters.iter().all(|f| f.accepts(record)));
    for record in table.rows_mut() {
        for transform in transforms {
            transform.apply(record);
        }
    }

    debug!(
        "Reference {}: {} rows read, {} kept after filters",
        path.display(),
        loaded,
        table.len()
    );
    Ok(table)
}

/// Parse CSV rows into records: empty cell → `Null`, numeric → `Number`,
/// otherwise `Text`.
pub fn parse<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Table, ReferenceError> {
    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(ReferenceError::InvalidFormat(
            "Missing header row".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let row = result?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| (column.to_string(), Scalar::parse_cell(cell)))
            .collect();
        rows.push(record);
    }
    Ok(Table::new(rows))
}
