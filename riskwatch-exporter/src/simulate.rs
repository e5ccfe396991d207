// RiskWatch Exporter - HTTP ingestion and Prometheus exporter
// Copyright (c) 2025 David Martin Venti
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Synthetic maternal-health traffic.
//!
//! Feeds one random record at a fixed interval into a dataset so dashboards
//! have data without a real client.

use crate::app::now_ms;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use riskwatch::{IngestOutcome, Record, ServiceHandle};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// `(field, mean, std)`; values are drawn uniformly in mean ± 2·std.
pub const FEATURES: [(&str, f64, f64); 6] = [
    ("Age", 29.9, 13.5),
    ("SystolicBP", 113.2, 18.4),
    ("DiastolicBP", 76.5, 13.9),
    ("BS", 8.7, 3.3),
    ("BodyTemp", 37.0, 0.7),
    ("HeartRate", 74.3, 8.1),
];

pub const RISK_LEVELS: [&str; 3] = ["high risk", "mid risk", "low risk"];

/// Build one synthetic record.
pub fn synthetic_record<R: Rng>(rng: &mut R) -> Record {
    let mut record = Record::new();
    for (field, mean, std) in FEATURES {
        record.insert(field, rng.gen_range(mean - 2.0 * std..=mean + 2.0 * std));
    }
    let risk = RISK_LEVELS.choose(rng).copied().unwrap_or("low risk");
    record.insert("RiskLevel", risk);
    record
}

/// Background traffic generator for one dataset.
pub struct Simulator {
    service: ServiceHandle,
    dataset: String,
    interval: Duration,
    rng: StdRng,
}

impl Simulator {
    pub fn new(service: ServiceHandle, dataset: impl Into<String>, interval: Duration) -> Self {
        Self {
            service,
            dataset: dataset.into(),
            interval,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed seed, for reproducible traffic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Send one record. Errors are logged and do not stop the simulator.
    pub async fn step(&mut self) -> Option<IngestOutcome> {
        let record = synthetic_record(&mut self.rng);
        let service = ServiceHandle::clone(&self.service);
        let dataset = self.dataset.clone();

        match tokio::task::spawn_blocking(move || service.ingest(&dataset, vec![record], now_ms()))
            .await
        {
            Ok(Ok(outcome)) => {
                debug!("Simulated record for {}: {:?}", self.dataset, outcome);
                Some(outcome)
            }
            Ok(Err(e)) => {
                warn!("Simulated record for {} rejected: {}", self.dataset, e);
                None
            }
            Err(e) => {
                warn!("Simulator task failed: {}", e);
                None
            }
        }
    }

    /// Run until the task is dropped.
    pub async fn run(mut self) {
        info!(
            "Simulating traffic for {} every {}ms",
            self.dataset,
            self.interval.as_millis()
        );
        loop {
            self.step().await;
            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use riskwatch::{
        ColumnMapping, DatasetRegistration, MonitoringService, ServiceOptions, SummaryEngine,
        Table,
    };
    use std::sync::Arc;

    #[test]
    fn test_record_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let record = synthetic_record(&mut rng);
            for (field, mean, std) in FEATURES {
                let v = record.get(field).and_then(|s| s.as_f64()).unwrap();
                assert!(v >= mean - 2.0 * std && v <= mean + 2.0 * std, "{} = {}", field, v);
            }
            let risk = record.get("RiskLevel").unwrap().to_string();
            assert!(RISK_LEVELS.contains(&risk.as_str()));
        }
    }

    #[tokio::test]
    async fn test_step_feeds_service() {
        let features: Vec<String> = FEATURES.iter().map(|(f, _, _)| f.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let reference = Table::new((0..5).map(|_| synthetic_record(&mut rng)).collect());
        let dataset = DatasetRegistration::new(
            "maternal-health-risk",
            reference,
            vec!["data_quality".to_string(), "target_distribution".to_string()],
            ColumnMapping {
                numerical_features: features,
                target: Some("RiskLevel".to_string()),
                ..Default::default()
            },
        );
        let options = ServiceOptions {
            window_size: 2,
            ..Default::default()
        };
        let service =
            MonitoringService::initialize(options, vec![dataset], Arc::new(SummaryEngine::new()))
                .unwrap();

        let mut simulator = Simulator::new(
            Arc::clone(&service),
            "maternal-health-risk",
            Duration::from_millis(1),
        )
        .with_seed(3);

        let first = simulator.step().await;
        assert!(matches!(first, Some(IngestOutcome::Warming { size: 1, required: 2 })));
        let second = simulator.step().await;
        assert!(matches!(second, Some(IngestOutcome::Computed(_))));
        assert_eq!(service.window_len("maternal-health-risk").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_step_unknown_dataset() {
        let service = MonitoringService::initialize(
            ServiceOptions::default(),
            Vec::new(),
            Arc::new(SummaryEngine::new()),
        )
        .unwrap();
        let mut simulator = Simulator::new(service, "missing", Duration::from_millis(1));
        assert!(simulator.step().await.is_none());
    }
}
