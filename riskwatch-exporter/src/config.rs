// RiskWatch Exporter - HTTP ingestion and Prometheus exporter
// Copyright (c) 2025 David Martin Venti
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Configuration file loading.
//!
//! The file is TOML with one `[service]` table and one `[datasets.<name>]`
//! table per monitored dataset. It is read once at startup.

use crate::reference::{self, ReferenceError, RowFilter, Transform};
use riskwatch::{ColumnMapping, DatasetRegistration, ServiceOptions};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Dataset {dataset}: {source}")]
    Reference {
        dataset: String,
        #[source]
        source: ReferenceError,
    },

    #[error("Dataset {dataset}: reference data has {rows} rows, at least {required} required")]
    ReferenceTooSmall {
        dataset: String,
        rows: usize,
        required: usize,
    },

    #[error("No datasets configured")]
    NoDatasets,
}

/// `[service]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    #[serde(flatten)]
    pub options: ServiceOptions,

    /// Minimum number of reference rows left after filtering.
    pub min_reference_size: usize,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            options: ServiceOptions::default(),
            min_reference_size: 30,
        }
    }
}

/// `[datasets.<name>]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    /// CSV file, relative to the config file directory unless absolute.
    pub reference_file: PathBuf,

    pub monitors: Vec<String>,

    #[serde(default)]
    pub column_mapping: ColumnMapping,

    #[serde(default)]
    pub filters: Vec<RowFilter>,

    #[serde(default)]
    pub transforms: Vec<Transform>,
}

/// Whole configuration file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExporterConfig {
    #[serde(default)]
    pub service: ServiceSection,

    #[serde(default)]
    pub datasets: BTreeMap<String, DatasetConfig>,

    /// Directory relative reference paths resolve against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ExporterConfig {
    /// Read and parse a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse config text; relative paths resolve against the working directory.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.service.options
    }

    /// Absolute or base-relative path of a dataset's reference file.
    pub fn reference_path(&self, dataset: &DatasetConfig) -> PathBuf {
        if dataset.reference_file.is_absolute() {
            dataset.reference_file.clone()
        } else {
            self.base_dir.join(&dataset.reference_file)
        }
    }

    /// Load every dataset's reference data and build its registration.
    pub fn registrations(&self) -> Result<Vec<DatasetRegistration>, ConfigError> {
        if self.datasets.is_empty() {
            return Err(ConfigError::NoDatasets);
        }

        let required = self.service.min_reference_size;
        self.datasets
            .iter()
            .map(|(name, dataset)| {
                let path = self.reference_path(dataset);
                let table =
                    reference::load(&path, &dataset.filters, &dataset.transforms).map_err(
                        |source| ConfigError::Reference {
                            dataset: name.clone(),
                            source,
                        },
                    )?;

                if table.len() < required {
                    return Err(ConfigError::ReferenceTooSmall {
                        dataset: name.clone(),
                        rows: table.len(),
                        required,
                    });
                }

                info!(
                    "Loaded reference data for {} from {}: {} rows",
                    name,
                    path.display(),
                    table.len()
                );

                Ok(DatasetRegistration::new(
                    name.clone(),
                    table,
                    dataset.monitors.clone(),
                    dataset.column_mapping.clone(),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[service]
window_size = 20
calculation_period_sec = 5
min_reference_size = 2

[datasets.maternal-health-risk]
reference_file = "data.csv"
monitors = ["data_quality", "target_distribution"]

[datasets.maternal-health-risk.column_mapping]
numerical_features = ["Age", "BodyTemp"]
target = "RiskLevel"

[[datasets.maternal-health-risk.filters]]
column = "Age"
min = 13.0
max = 50.0

[[datasets.maternal-health-risk.transforms]]
column = "BodyTemp"
kind = "fahrenheit_to_celsius"
"#;

    fn write_dir(config: &str, csv: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("riskwatch.toml");
        std::fs::write(&config_path, config).unwrap();
        let mut file = std::fs::File::create(dir.path().join("data.csv")).unwrap();
        file.write_all(csv.as_bytes()).unwrap();
        (dir, config_path)
    }

    #[test]
    fn test_parse_full_config() {
        let config = ExporterConfig::parse(CONFIG).unwrap();
        assert_eq!(config.options().window_size, 20);
        assert_eq!(config.options().calculation_period_sec, 5);
        assert_eq!(config.options().metric_prefix, "riskwatch");
        assert_eq!(config.service.min_reference_size, 2);

        let dataset = &config.datasets["maternal-health-risk"];
        assert_eq!(dataset.monitors.len(), 2);
        assert_eq!(dataset.column_mapping.target.as_deref(), Some("RiskLevel"));
        assert_eq!(dataset.filters[0].column, "Age");
        assert_eq!(dataset.transforms.len(), 1);
    }

    #[test]
    fn test_defaults() {
        let config = ExporterConfig::parse(
            "[datasets.a]\nreference_file = \"a.csv\"\nmonitors = []\n",
        )
        .unwrap();
        assert_eq!(config.service, ServiceSection::default());
        assert_eq!(config.options().window_size, 50);
        assert_eq!(config.service.min_reference_size, 30);
    }

    #[test]
    fn test_unknown_transform_rejected() {
        let text = r#"
[datasets.a]
reference_file = "a.csv"
monitors = []

[[datasets.a.transforms]]
column = "BodyTemp"
kind = "kelvin"
"#;
        assert!(ExporterConfig::parse(text).is_err());
    }

    #[test]
    fn test_registrations_resolve_relative_path() {
        let csv = "Age,BodyTemp,RiskLevel\n25,98.6,low risk\n30,100.4,high risk\n70,98.6,low risk\n";
        let (_dir, path) = write_dir(CONFIG, csv);

        let config = ExporterConfig::from_file(&path).unwrap();
        let registrations = config.registrations().unwrap();
        assert_eq!(registrations.len(), 1);

        let reference = &registrations[0].reference_data;
        // Age 70 is outside the filter range.
        assert_eq!(reference.len(), 2);
        let temp = reference.numeric_column("BodyTemp");
        assert!((temp[0] - 37.0).abs() < 1e-9);
        assert!((temp[1] - 38.0).abs() < 1e-9);
    }

    #[test]
    fn test_reference_too_small() {
        let csv = "Age,BodyTemp,RiskLevel\n25,98.6,low risk\n";
        let (_dir, path) = write_dir(CONFIG, csv);

        let err = ExporterConfig::from_file(&path)
            .unwrap()
            .registrations()
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ReferenceTooSmall { rows: 1, required: 2, .. }
        ));
    }

    #[test]
    fn test_missing_reference_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("riskwatch.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let err = ExporterConfig::from_file(&path)
            .unwrap()
            .registrations()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Reference { .. }));
    }

    #[test]
    fn test_missing_config_file() {
        let err = ExporterConfig::from_file("/nonexistent/riskwatch.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../config/riskwatch.toml");
        let config = ExporterConfig::from_file(path).unwrap();
        let registrations = config.registrations().unwrap();

        assert_eq!(registrations[0].name, "maternal-health-risk");
        assert!(registrations[0].reference_data.len() >= config.service.min_reference_size);
        let temps = registrations[0].reference_data.numeric_column("BodyTemp");
        assert!(temps.iter().all(|t| (36.0..40.0).contains(t)));
    }

    #[test]
    fn test_no_datasets() {
        let config = ExporterConfig::parse("[service]\nwindow_size = 5\n").unwrap();
        assert!(matches!(
            config.registrations(),
            Err(ConfigError::NoDatasets)
        ));
    }
}
