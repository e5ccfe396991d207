//! Record model shared by the window store and the drift engines.
//!
//! A [`Record`] is a flat, ordered mapping from field name to [`Scalar`].
//! Nothing in the window, gate or registry looks inside a record; only drift
//! engines interpret fields, through the column accessors of [`Table`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Scalar {
    /// Missing value (`null` in JSON, empty cell in CSV).
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Any number. Integers are widened to `f64`.
    Number(f64),
    /// Free text, including categorical labels.
    Text(String),
}

impl Scalar {
    /// Numeric view used by drift engines. Booleans are not treated as numbers here.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Value a gauge can hold: numbers as-is, booleans as 1/0.
    pub fn gauge_value(&self) -> Option<f64> {
        match self {
            Scalar::Number(v) => Some(*v),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Text(_) | Scalar::Null => None,
        }
    }

    /// Whether the value is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Parse a raw text cell: empty → `Null`, numeric → `Number`, otherwise `Text`.
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Scalar::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(v) => Scalar::Number(v),
            Err(_) => Scalar::Text(trimmed.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(v) => write!(f, "{}", v),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Number(v as f64)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// A flat record: field name → scalar, ordered by field name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Scalar>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert or replace a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Scalar>) -> Option<Scalar> {
        self.fields.insert(field.into(), value.into())
    }

    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.fields.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Scalar> {
        self.fields.get_mut(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, Scalar)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// An ordered sequence of records (reference data or a window snapshot).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Record>,
}

impl Table {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut Vec<Record> {
        &mut self.rows
    }

    /// Whether at least one row carries the field.
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|r| r.contains(column))
    }

    /// Numeric values of a column, skipping missing and non-numeric cells.
    pub fn numeric_column(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|r| r.get(column).and_then(Scalar::as_f64))
            .collect()
    }

    /// Number of rows where the column is absent, null or not numeric.
    pub fn missing_count(&self, column: &str) -> usize {
        self.rows
            .iter()
            .filter(|r| r.get(column).and_then(Scalar::as_f64).is_none())
            .count()
    }

    /// Display values of a column, skipping absent and null cells.
    pub fn display_column(&self, column: &str) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r.get(column))
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect()
    }

    /// Keep only rows matching the predicate.
    pub fn retain(&mut self, f: impl FnMut(&Record) -> bool) {
        self.rows.retain(f);
    }
}

impl From<Vec<Record>> for Table {
    fn from(rows: Vec<Record>) -> Self {
        Self::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_from_json() {
        let parsed: Vec<Scalar> = serde_json::from_str(r#"[null, true, 3, 2.5, "mid risk"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Scalar::Null,
                Scalar::Bool(true),
                Scalar::Number(3.0),
                Scalar::Number(2.5),
                Scalar::Text("mid risk".to_string()),
            ]
        );
    }

    #[test]
    fn test_gauge_value() {
        assert_eq!(Scalar::Number(0.5).gauge_value(), Some(0.5));
        assert_eq!(Scalar::Bool(true).gauge_value(), Some(1.0));
        assert_eq!(Scalar::Bool(false).gauge_value(), Some(0.0));
        assert_eq!(Scalar::Text("num".into()).gauge_value(), None);
        assert_eq!(Scalar::Null.gauge_value(), None);
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(Scalar::parse_cell(""), Scalar::Null);
        assert_eq!(Scalar::parse_cell(" 98.6 "), Scalar::Number(98.6));
        assert_eq!(Scalar::parse_cell("high risk"), Scalar::Text("high risk".into()));
    }

    #[test]
    fn test_record_from_json_array() {
        let rows: Vec<Record> =
            serde_json::from_str(r#"[{"Age": 25, "RiskLevel": "low risk"}, {"Age": null}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Age"), Some(&Scalar::Number(25.0)));
        assert_eq!(rows[1].get("Age"), Some(&Scalar::Null));
    }

    #[test]
    fn test_table_columns() {
        let table = Table::new(vec![
            Record::new().with("Age", 20.0).with("RiskLevel", "low risk"),
            Record::new().with("Age", Scalar::Null),
            Record::new().with("Age", "unknown"),
        ]);

        assert!(table.has_column("Age"));
        assert!(!table.has_column("HeartRate"));
        assert_eq!(table.numeric_column("Age"), vec![20.0]);
        assert_eq!(table.missing_count("Age"), 2);
        assert_eq!(table.display_column("RiskLevel"), vec!["low risk".to_string()]);
    }
}
