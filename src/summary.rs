//! Built-in descriptive-statistics engine.
//!
//! Stands in for an external drift engine. It runs no statistical tests; it
//! summarises both tables side by side so dashboards can compare them.
//!
//! | Monitor | Metrics |
//! |---------|---------|
//! | `data_quality` | `data_quality:row_count`, `data_quality:mean`, `data_quality:std`, `data_quality:missing_count`, `data_quality:feature_type` |
//! | `target_distribution` | `target_distribution:share` |

use crate::dataset::ColumnMapping;
use crate::engine::{DriftEngine, MetricSample};
use crate::error::EngineError;
use crate::record::Table;
use std::collections::BTreeMap;

pub const DATA_QUALITY: &str = "data_quality";
pub const TARGET_DISTRIBUTION: &str = "target_distribution";

const SLICES: [&str; 2] = ["reference", "current"];

/// Descriptive statistics over reference and current data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryEngine;

impl SummaryEngine {
    pub fn new() -> Self {
        Self
    }

    fn data_quality(
        &self,
        tables: [&Table; 2],
        mapping: &ColumnMapping,
        out: &mut Vec<MetricSample>,
    ) -> Result<(), EngineError> {
        for (slice, table) in SLICES.iter().zip(tables) {
            for feature in &mapping.numerical_features {
                if !table.has_column(feature) {
                    return Err(EngineError::MissingColumn {
                        column: feature.clone(),
                        table: *slice,
                    });
                }
            }
        }

        for (slice, table) in SLICES.iter().zip(tables) {
            out.push(
                MetricSample::new("data_quality:row_count", table.len() as f64)
                    .with_label("slice", *slice),
            );

            for feature in &mapping.numerical_features {
                let values = table.numeric_column(feature);
                let (mean, std) = mean_std(&values);
                out.push(
                    MetricSample::new("data_quality:mean", mean)
                        .with_label("feature", feature.as_str())
                        .with_label("slice", *slice),
                );
                out.push(
                    MetricSample::new("data_quality:std", std)
                        .with_label("feature", feature.as_str())
                        .with_label("slice", *slice),
                );
                out.push(
                    MetricSample::new(
                        "data_quality:missing_count",
                        table.missing_count(feature) as f64,
                    )
                    .with_label("feature", feature.as_str())
                    .with_label("slice", *slice),
                );
            }
        }

        // Feature roles are informational only and never become gauges.
        for feature in &mapping.numerical_features {
            out.push(
                MetricSample::new("data_quality:feature_type", "num")
                    .with_label("feature", feature.as_str()),
            );
        }
        for feature in &mapping.categorical_features {
            out.push(
                MetricSample::new("data_quality:feature_type", "cat")
                    .with_label("feature", feature.as_str()),
            );
        }

        Ok(())
    }

    fn target_distribution(
        &self,
        tables: [&Table; 2],
        mapping: &ColumnMapping,
        out: &mut Vec<MetricSample>,
    ) -> Result<(), EngineError> {
        let target = mapping
            .target
            .as_deref()
            .ok_or_else(|| EngineError::MissingRole {
                monitor: TARGET_DISTRIBUTION.to_string(),
                role: "target",
            })?;

        let mut counts: [BTreeMap<String, usize>; 2] = Default::default();
        for ((slice, table), slice_counts) in SLICES.iter().zip(tables).zip(counts.iter_mut()) {
            if !table.has_column(target) {
                return Err(EngineError::MissingColumn {
                    column: target.to_string(),
                    table: *slice,
                });
            }
            for class in table.display_column(target) {
                *slice_counts.entry(class).or_default() += 1;
            }
        }

        let mut classes: Vec<&String> = counts.iter().flat_map(|c| c.keys()).collect();
        classes.sort();
        classes.dedup();

        for ((slice, table), slice_counts) in SLICES.iter().zip(tables).zip(counts.iter()) {
            let total = table.len().max(1) as f64;
            for class in &classes {
                let count = slice_counts.get(*class).copied().unwrap_or(0);
                out.push(
                    MetricSample::new("target_distribution:share", count as f64 / total)
                        .with_label("class", class.as_str())
                        .with_label("slice", *slice),
                );
            }
        }

        Ok(())
    }
}

impl DriftEngine for SummaryEngine {
    fn supports(&self, monitor: &str) -> bool {
        matches!(monitor, DATA_QUALITY | TARGET_DISTRIBUTION)
    }

    fn compute(
        &self,
        reference: &Table,
        current: &Table,
        mapping: &ColumnMapping,
        monitors: &[String],
    ) -> Result<Vec<MetricSample>, EngineError> {
        let tables = [reference, current];
        let mut out = Vec::new();
        for monitor in monitors {
            match monitor.as_str() {
                DATA_QUALITY => self.data_quality(tables, mapping, &mut out)?,
                TARGET_DISTRIBUTION => self.target_distribution(tables, mapping, &mut out)?,
                other => return Err(EngineError::UnsupportedMonitor(other.to_string())),
            }
        }
        Ok(out)
    }
}

/// Mean and population standard deviation; zeros for an empty slice.
fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
