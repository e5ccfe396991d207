//! # RiskWatch - rolling-window drift monitoring
//!
//! Keeps a bounded window of recent records per dataset, periodically runs a
//! drift engine on it against a fixed reference table, and republishes the
//! engine's output as Prometheus gauges.
//!
//! ## Key Features
//!
//! - **Bounded windows**: each dataset keeps only its most recent records
//! - **Rate-limited computation**: at most one run per calculation period
//! - **Dynamic metrics**: gauge series are created on first observation
//! - **Pluggable engines**: any [`DriftEngine`] can produce the metrics
//!
//! ## Quick Start
//!
//! ```rust
//! use riskwatch::{
//!     ColumnMapping, DatasetRegistration, MonitoringService, Record, ServiceOptions,
//!     SummaryEngine, Table,
//! };
//! use std::sync::Arc;
//!
//! let reference = Table::new(vec![
//!     Record::new().with("Age", 25.0).with("RiskLevel", "low risk"),
//!     Record::new().with("Age", 35.0).with("RiskLevel", "high risk"),
//! ]);
//! let dataset = DatasetRegistration::new(
//!     "maternal-health-risk",
//!     reference,
//!     vec!["data_quality".to_string(), "target_distribution".to_string()],
//!     ColumnMapping {
//!         numerical_features: vec!["Age".to_string()],
//!         target: Some("RiskLevel".to_string()),
//!         ..Default::default()
//!     },
//! );
//! let options = ServiceOptions {
//!     window_size: 1,
//!     ..Default::default()
//! };
//!
//! let service =
//!     MonitoringService::initialize(options, vec![dataset], Arc::new(SummaryEngine::new()))
//!         .unwrap();
//! let batch = vec![Record::new().with("Age", 31.0).with("RiskLevel", "mid risk")];
//! service.ingest("maternal-health-risk", batch, 0).unwrap();
//!
//! let exposition = service.encode_metrics().unwrap();
//! assert!(exposition.contains("riskwatch:target_distribution:share"));
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Service options
//! - [`dataset`]: Dataset registrations and column roles
//! - [`error`]: Error types
//! - [`record`]: Loosely typed records and tables
//! - [`window`]: Bounded most-recent record window
//! - [`schedule`]: Per-dataset computation cooldown
//! - [`registry`]: Lazily created gauge series
//! - [`engine`]: Drift engine trait and metric samples
//! - [`summary`]: Built-in descriptive-statistics engine
//! - [`service`]: Monitoring orchestrator

// Modules
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod record;
pub mod registry;
pub mod schedule;
pub mod service;
pub mod summary;
pub mod window;

// Re-exports for convenient access
pub use config::ServiceOptions;
pub use dataset::{ColumnMapping, DatasetRegistration};
pub use engine::{DriftEngine, Labels, MetricSample};
pub use error::{EngineError, MonitorError, RegistryError, Result};
pub use record::{Record, Scalar, Table};
pub use registry::{MetricRegistry, RecordOutcome, DATASET_LABEL};
pub use schedule::ScheduleGate;
pub use service::{DatasetStatus, IngestOutcome, MonitoringService, PublishReport, ServiceHandle};
pub use summary::SummaryEngine;
pub use window::RecordWindow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
