//! Static dataset registrations.

use crate::record::Table;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Declares the role of each field for drift engines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Continuous input features.
    pub numerical_features: Vec<String>,
    /// Discrete input features.
    pub categorical_features: Vec<String>,
    /// Ground-truth label field.
    pub target: Option<String>,
    /// Model output field.
    pub prediction: Option<String>,
}

/// A dataset known to the monitoring service.
///
/// Built once at startup and never mutated; the reference table is shared
/// with every drift computation through an `Arc`.
#[derive(Debug, Clone)]
pub struct DatasetRegistration {
    pub name: String,
    pub reference_data: Arc<Table>,
    pub monitors: Vec<String>,
    pub column_mapping: ColumnMapping,
}

impl DatasetRegistration {
    pub fn new(
        name: impl Into<String>,
        reference_data: Table,
        monitors: Vec<String>,
        column_mapping: ColumnMapping,
    ) -> Self {
        Self {
            name: name.into(),
            reference_data: Arc::new(reference_data),
            monitors,
            column_mapping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_mapping_partial_json() {
        let mapping: ColumnMapping =
            serde_json::from_str(r#"{"numerical_features": ["Age"], "target": "RiskLevel"}"#).unwrap();
        assert_eq!(mapping.numerical_features, vec!["Age".to_string()]);
        assert!(mapping.categorical_features.is_empty());
        assert_eq!(mapping.target.as_deref(), Some("RiskLevel"));
        assert!(mapping.prediction.is_none());
    }
}
