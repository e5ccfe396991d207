//! Drift engine seam.
//!
//! The statistical engine is an external collaborator. The orchestrator hands
//! it the reference table, the current window and the dataset's column
//! mapping, and republishes whatever named values come back without
//! interpreting them.

use crate::dataset::ColumnMapping;
use crate::error::EngineError;
use crate::record::{Scalar, Table};
use std::collections::BTreeMap;

/// Label set attached to a metric value, ordered by key.
pub type Labels = BTreeMap<String, String>;

/// One `(name, value, labels)` triple produced by a drift engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub value: Scalar,
    pub labels: Labels,
}

impl MetricSample {
    pub fn new(name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            labels: Labels::new(),
        }
    }

    /// Builder-style label insertion.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Computes drift metrics for one dataset.
///
/// Implementations must be callable from several threads at once; the
/// service never calls `compute` twice concurrently for the same dataset.
pub trait DriftEngine: Send + Sync {
    /// Whether `monitor` is a check this engine can run.
    fn supports(&self, monitor: &str) -> bool;

    /// Run the monitors and return the resulting metric samples.
    fn compute(
        &self,
        reference: &Table,
        current: &Table,
        mapping: &ColumnMapping,
        monitors: &[String],
    ) -> Result<Vec<MetricSample>, EngineError>;
}
