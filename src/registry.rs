//! Lazily created gauge series keyed by metric name.
//!
//! The first observation of a metric name fixes its label-key schema. Later
//! observations with another key set are rejected one by one with
//! [`RegistryError::LabelMismatch`], leaving every other series untouched.

use crate::engine::Labels;
use crate::error::RegistryError;
use crate::record::Scalar;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Label attached to every series.
pub const DATASET_LABEL: &str = "dataset_name";

/// Result of a successful [`MetricRegistry::record`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The gauge was set. `created` is true when this call defined the series.
    Recorded { created: bool },
    /// The value was not numeric and was ignored.
    Skipped,
}

/// A metric name's fixed schema and its gauge vector.
struct MetricSeries {
    keys: Vec<String>,
    gauge: GaugeVec,
}

impl MetricSeries {
    fn set(
        &self,
        metric: &str,
        keys: &[String],
        values: &[&str],
        value: f64,
    ) -> Result<(), RegistryError> {
        if self.keys.as_slice() != keys {
            return Err(RegistryError::LabelMismatch {
                metric: metric.to_string(),
                expected: self.keys.clone(),
                actual: keys.to_vec(),
            });
        }
        self.gauge.get_metric_with_label_values(values)?.set(value);
        Ok(())
    }
}

/// Registry of dynamically created gauge series.
pub struct MetricRegistry {
    prefix: String,
    registry: Registry,
    series: RwLock<HashMap<String, MetricSeries>>,
}

impl MetricRegistry {
    /// Create a registry whose series are exposed as `<prefix>:<metric>`.
    /// An empty prefix exposes metric names unchanged.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_registry(prefix, Registry::new())
    }

    /// Create a registry on top of an existing exposition registry.
    pub fn with_registry(prefix: impl Into<String>, registry: Registry) -> Self {
        Self {
            prefix: prefix.into(),
            registry,
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Underlying exposition registry, for collectors owned by the caller.
    pub fn prometheus(&self) -> &Registry {
        &self.registry
    }

    /// Name under which an engine metric is exposed.
    pub fn exposed_name(&self, metric_name: &str) -> String {
        if self.prefix.is_empty() {
            metric_name.to_string()
        } else {
            format!("{}:{}", self.prefix, metric_name)
        }
    }

    /// Record one engine value for a dataset.
    pub fn record(
        &self,
        dataset_name: &str,
        metric_name: &str,
        value: &Scalar,
        labels: &Labels,
    ) -> Result<RecordOutcome, RegistryError> {
        let Some(value) = value.gauge_value() else {
            return Ok(RecordOutcome::Skipped);
        };

        let mut labels = labels.clone();
        labels.insert(DATASET_LABEL.to_string(), dataset_name.to_string());
        let keys: Vec<String> = labels.keys().cloned().collect();
        let values: Vec<&str> = labels.values().map(String::as_str).collect();
        let name = self.exposed_name(metric_name);

        if let Some(series) = self.read().get(&name) {
            series.set(&name, &keys, &values, value)?;
            return Ok(RecordOutcome::Recorded { created: false });
        }

        let mut all = self.write();
        match all.entry(name) {
            Entry::Occupied(entry) => {
                entry.get().set(entry.key(), &keys, &values, value)?;
                Ok(RecordOutcome::Recorded { created: false })
            }
            Entry::Vacant(entry) => {
                let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
                let opts = Opts::new(
                    entry.key().clone(),
                    format!("{} reported by the drift engine", metric_name),
                );
                let gauge = GaugeVec::new(opts, &key_refs)?;
                gauge.get_metric_with_label_values(&values)?.set(value);
                self.registry.register(Box::new(gauge.clone()))?;
                entry.insert(MetricSeries { keys, gauge });
                Ok(RecordOutcome::Recorded { created: true })
            }
        }
    }

    /// Current value of one series, labels including `dataset_name`.
    pub fn value(&self, metric_name: &str, labels: &Labels) -> Option<f64> {
        let name = self.exposed_name(metric_name);
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric())
            .find(|metric| {
                let pairs = metric.get_label();
                pairs.len() == labels.len()
                    && pairs
                        .iter()
                        .all(|p| labels.get(p.get_name()).map(String::as_str) == Some(p.get_value()))
            })
            .map(|metric| metric.get_gauge().get_value())
    }

    /// Number of label combinations recorded for a metric.
    pub fn series_count(&self, metric_name: &str) -> usize {
        let name = self.exposed_name(metric_name);
        self.registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == name)
            .map(|family| family.get_metric().len())
            .sum()
    }

    /// Label-key schema of a metric, if it has been observed.
    pub fn label_keys(&self, metric_name: &str) -> Option<Vec<String>> {
        self.read()
            .get(&self.exposed_name(metric_name))
            .map(|series| series.keys.clone())
    }

    /// Exposed names of all dynamically created metrics, sorted.
    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Encode every collector in the Prometheus text format.
    pub fn encode(&self) -> Result<String, RegistryError> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, MetricSeries>> {
        self.series.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, MetricSeries>> {
        self.series.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("prefix", &self.prefix)
            .field("metrics", &self.metric_names())
            .finish()
    }
}
