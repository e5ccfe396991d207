//! Monitoring orchestrator.
//!
//! Each registered dataset owns a lane: its record window and schedule gate
//! behind one mutex. An ingestion call holds its dataset's lane from append
//! to publish, so window mutation and the drift computation of one dataset
//! never interleave, while other datasets proceed on their own lanes.
//!
//! ```rust
//! use riskwatch::{
//!     ColumnMapping, DatasetRegistration, IngestOutcome, MonitoringService, Record,
//!     ServiceOptions, SummaryEngine, Table,
//! };
//! use std::sync::Arc;
//!
//! let reference = Table::new(vec![Record::new().with("Age", 30.0)]);
//! let dataset = DatasetRegistration::new(
//!     "risk",
//!     reference,
//!     vec!["data_quality".to_string()],
//!     ColumnMapping {
//!         numerical_features: vec!["Age".to_string()],
//!         ..Default::default()
//!     },
//! );
//! let options = ServiceOptions {
//!     window_size: 2,
//!     ..Default::default()
//! };
//! let service =
//!     MonitoringService::initialize(options, vec![dataset], Arc::new(SummaryEngine::new()))
//!         .unwrap();
//!
//! let batch = vec![Record::new().with("Age", 25.0)];
//! let outcome = service.ingest("risk", batch.clone(), 0).unwrap();
//! assert!(matches!(outcome, IngestOutcome::Warming { size: 1, required: 2 }));
//!
//! let outcome = service.ingest("risk", batch, 1_000).unwrap();
//! assert!(matches!(outcome, IngestOutcome::Computed(_)));
//! assert!(service.encode_metrics().unwrap().contains("riskwatch:data_quality:mean"));
//! ```

use crate::config::ServiceOptions;
use crate::dataset::DatasetRegistration;
use crate::engine::{DriftEngine, MetricSample};
use crate::error::{MonitorError, RegistryError, Result};
use crate::record::Record;
use crate::registry::{MetricRegistry, RecordOutcome, DATASET_LABEL};
use crate::schedule::ScheduleGate;
use crate::window::RecordWindow;
use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use tracing::{debug, error, info, warn};

/// Shared handle to an initialised service.
pub type ServiceHandle = Arc<MonitoringService>;

/// What an ingestion call did after appending its records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The window is not full yet.
    Warming { size: usize, required: usize },
    /// A computation ran recently; the next one is allowed at `next_run_ms`.
    CoolingDown { next_run_ms: u64 },
    /// The drift engine ran and its output was published.
    Computed(PublishReport),
}

/// Per-cycle tally of engine samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Samples written to a gauge.
    pub published: usize,
    /// Non-numeric samples ignored.
    pub skipped: usize,
    /// Samples dropped by the registry (label mismatch, invalid name).
    pub rejected: usize,
}

/// Point-in-time view of one dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStatus {
    pub name: String,
    pub monitors: Vec<String>,
    pub reference_rows: usize,
    pub window_capacity: usize,
    /// `None` while the dataset is busy computing.
    pub window_len: Option<usize>,
    pub next_run_ms: Option<u64>,
    pub computations: Option<u64>,
    pub busy: bool,
}

/// Mutable per-dataset state.
struct Lane {
    window: RecordWindow,
    gate: ScheduleGate,
    computations: u64,
}

struct Dataset {
    registration: DatasetRegistration,
    lane: Mutex<Lane>,
}

impl Dataset {
    fn lock(&self) -> MutexGuard<'_, Lane> {
        self.lane.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The service's own counters, labelled by dataset.
struct ServiceCounters {
    ingested_records: IntCounterVec,
    computations: IntCounterVec,
    engine_failures: IntCounterVec,
    skipped_values: IntCounterVec,
    rejected_updates: IntCounterVec,
    window_records: IntGaugeVec,
}

impl ServiceCounters {
    fn register(registry: &Registry, namespace: &str) -> prometheus::Result<Self> {
        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounterVec> {
            let vec = IntCounterVec::new(
                Opts::new(format!("{}_{}", namespace, name), help),
                &[DATASET_LABEL],
            )?;
            registry.register(Box::new(vec.clone()))?;
            Ok(vec)
        };

        let window_records = IntGaugeVec::new(
            Opts::new(
                format!("{}_window_records", namespace),
                "Records currently held in the dataset window",
            ),
            &[DATASET_LABEL],
        )?;
        registry.register(Box::new(window_records.clone()))?;

        Ok(Self {
            ingested_records: counter("ingested_records_total", "Records received for the dataset")?,
            computations: counter("computations_total", "Drift computations started")?,
            engine_failures: counter("engine_failures_total", "Drift computations that failed")?,
            skipped_values: counter("skipped_values_total", "Non-numeric engine values ignored")?,
            rejected_updates: counter("rejected_updates_total", "Metric updates dropped by the registry")?,
            window_records,
        })
    }
}

/// Rolling-window drift monitoring over a fixed set of datasets.
pub struct MonitoringService {
    options: ServiceOptions,
    datasets: HashMap<String, Dataset>,
    engine: Arc<dyn DriftEngine>,
    registry: MetricRegistry,
    counters: ServiceCounters,
}

impl MonitoringService {
    /// Validate options and registrations and build the service.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] if the options are invalid, a
    /// dataset name appears twice, or a monitor is not supported by `engine`.
    pub fn initialize(
        options: ServiceOptions,
        registrations: Vec<DatasetRegistration>,
        engine: Arc<dyn DriftEngine>,
    ) -> Result<ServiceHandle> {
        options.validate()?;

        let registry = MetricRegistry::new(options.metric_prefix.clone());
        let counters = ServiceCounters::register(registry.prometheus(), options.telemetry_namespace())
            .map_err(RegistryError::from)?;

        let mut datasets = HashMap::with_capacity(registrations.len());
        for registration in registrations {
            if datasets.contains_key(&registration.name) {
                return Err(MonitorError::InvalidConfig(format!(
                    "dataset '{}' is registered twice",
                    registration.name
                )));
            }
            if let Some(monitor) = registration.monitors.iter().find(|m| !engine.supports(m)) {
                return Err(MonitorError::InvalidConfig(format!(
                    "dataset '{}' uses unsupported monitor '{}'",
                    registration.name, monitor
                )));
            }
            if registration.monitors.is_empty() {
                warn!("Dataset {} has no monitors configured", registration.name);
            }

            info!(
                "Registered dataset {}: {} reference rows, monitors {:?}",
                registration.name,
                registration.reference_data.len(),
                registration.monitors
            );

            let lane = Lane {
                window: RecordWindow::new(options.window_size),
                gate: ScheduleGate::new(options.calculation_period_ms()),
                computations: 0,
            };
            datasets.insert(
                registration.name.clone(),
                Dataset {
                    registration,
                    lane: Mutex::new(lane),
                },
            );
        }

        Ok(Arc::new(Self {
            options,
            datasets,
            engine,
            registry,
            counters,
        }))
    }

    /// Add records to a dataset and, when the window is full and the
    /// cooldown has elapsed, recompute and publish its metrics.
    ///
    /// `now_ms` is the caller's wall clock in milliseconds.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::DatasetNotFound`] for an unregistered dataset
    /// - [`MonitorError::EmptyBatch`] if `records` is empty
    /// - [`MonitorError::Engine`] if the drift engine fails; the cooldown
    ///   has already advanced, so the next attempt waits a full period.
    pub fn ingest(&self, dataset: &str, records: Vec<Record>, now_ms: u64) -> Result<IngestOutcome> {
        let entry = self
            .datasets
            .get(dataset)
            .ok_or_else(|| MonitorError::DatasetNotFound(dataset.to_string()))?;

        if records.is_empty() {
            return Err(MonitorError::EmptyBatch {
                dataset: dataset.to_string(),
            });
        }

        let batch_len = records.len();
        let mut lane = entry.lock();
        let size = lane.window.append(records);

        self.counters
            .ingested_records
            .with_label_values(&[dataset])
            .inc_by(batch_len as u64);
        self.counters
            .window_records
            .with_label_values(&[dataset])
            .set(size as i64);

        let required = lane.window.capacity();
        if !lane.window.is_full() {
            info!(
                "Not enough data for measurement on {}: {} of {}, waiting for more records",
                dataset, size, required
            );
            return Ok(IngestOutcome::Warming { size, required });
        }

        if !lane.gate.may_run(now_ms) {
            let next_run_ms = lane.gate.next_eligible_ms().unwrap_or(now_ms);
            info!("Next run for dataset {} at {}ms", dataset, next_run_ms);
            return Ok(IngestOutcome::CoolingDown { next_run_ms });
        }

        lane.gate.mark_ran(now_ms);
        lane.computations += 1;
        self.counters
            .computations
            .with_label_values(&[dataset])
            .inc();

        let registration = &entry.registration;
        let current = lane.window.snapshot();
        let samples = self
            .engine
            .compute(
                &registration.reference_data,
                &current,
                &registration.column_mapping,
                &registration.monitors,
            )
            .map_err(|source| {
                self.counters
                    .engine_failures
                    .with_label_values(&[dataset])
                    .inc();
                error!("Drift computation failed for dataset {}: {}", dataset, source);
                MonitorError::Engine {
                    dataset: dataset.to_string(),
                    source,
                }
            })?;

        let report = self.publish(dataset, &samples);
        info!(
            "Published metrics for dataset {}: {} recorded, {} skipped, {} rejected",
            dataset, report.published, report.skipped, report.rejected
        );
        Ok(IngestOutcome::Computed(report))
    }

    fn publish(&self, dataset: &str, samples: &[MetricSample]) -> PublishReport {
        let mut report = PublishReport::default();

        for sample in samples {
            match self
                .registry
                .record(dataset, &sample.name, &sample.value, &sample.labels)
            {
                Ok(RecordOutcome::Recorded { created }) => {
                    if created {
                        debug!("Created series {}", self.registry.exposed_name(&sample.name));
                    }
                    report.published += 1;
                }
                Ok(RecordOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    // Other metrics of the batch still publish.
                    error!("Value error for metric {}: {}", sample.name, e);
                    report.rejected += 1;
                }
            }
        }

        self.counters
            .skipped_values
            .with_label_values(&[dataset])
            .inc_by(report.skipped as u64);
        self.counters
            .rejected_updates
            .with_label_values(&[dataset])
            .inc_by(report.rejected as u64);

        report
    }

    /// Prometheus text exposition of all series and service counters.
    pub fn encode_metrics(&self) -> std::result::Result<String, RegistryError> {
        self.registry.encode()
    }

    /// Status of every dataset, sorted by name. Never waits on a busy lane.
    pub fn status(&self) -> Vec<DatasetStatus> {
        let mut statuses: Vec<DatasetStatus> = self
            .datasets
            .values()
            .map(|dataset| {
                let registration = &dataset.registration;
                let mut status = DatasetStatus {
                    name: registration.name.clone(),
                    monitors: registration.monitors.clone(),
                    reference_rows: registration.reference_data.len(),
                    window_capacity: self.options.window_size,
                    window_len: None,
                    next_run_ms: None,
                    computations: None,
                    busy: false,
                };
                let lane = match dataset.lane.try_lock() {
                    Ok(lane) => Some(lane),
                    Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
                    Err(TryLockError::WouldBlock) => None,
                };
                match lane {
                    Some(lane) => {
                        status.window_len = Some(lane.window.len());
                        status.next_run_ms = lane.gate.next_eligible_ms();
                        status.computations = Some(lane.computations);
                    }
                    None => status.busy = true,
                }
                status
            })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Current window length of a dataset (waits for a busy lane).
    pub fn window_len(&self, dataset: &str) -> Result<usize> {
        self.datasets
            .get(dataset)
            .map(|d| d.lock().window.len())
            .ok_or_else(|| MonitorError::DatasetNotFound(dataset.to_string()))
    }

    /// Whether a dataset name is registered.
    pub fn is_registered(&self, dataset: &str) -> bool {
        self.datasets.contains_key(dataset)
    }

    /// Registered dataset names, sorted.
    pub fn dataset_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.datasets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn registry(&self) -> &MetricRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for MonitoringService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringService")
            .field("options", &self.options)
            .field("datasets", &self.dataset_names())
            .finish()
    }
}
