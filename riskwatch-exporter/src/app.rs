// RiskWatch Exporter - HTTP ingestion and Prometheus exporter
// Copyright (c) 2025 David Martin Venti
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! HTTP routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use riskwatch::{DatasetStatus, IngestOutcome, MonitorError, Record, ServiceHandle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

/// Application state shared across handlers.
pub struct AppState {
    pub service: ServiceHandle,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: ServiceHandle) -> Arc<Self> {
        Arc::new(Self {
            service,
            start_time: Instant::now(),
        })
    }
}

/// Build the router with every route attached.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/iterate/:dataset", post(iterate_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Handler failure mapped to a status code.
#[derive(Debug)]
pub enum ApiError {
    Monitor(MonitorError),
    Internal(String),
}

impl From<MonitorError> for ApiError {
    fn from(e: MonitorError) -> Self {
        ApiError::Monitor(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Monitor(MonitorError::DatasetNotFound(dataset)) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "DatasetNotFound",
                    dataset: Some(dataset),
                    message: None,
                },
            ),
            ApiError::Monitor(MonitorError::EmptyBatch { dataset }) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "EmptyBatch",
                    dataset: Some(dataset),
                    message: None,
                },
            ),
            ApiError::Monitor(MonitorError::Engine { dataset, source }) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "EngineFailure",
                    dataset: Some(dataset),
                    message: Some(source.to_string()),
                },
            ),
            ApiError::Monitor(other) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal",
                    dataset: None,
                    message: Some(other.to_string()),
                },
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal",
                    dataset: None,
                    message: Some(message),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Ingestion handler - appends a batch and may trigger a computation.
async fn iterate_handler(
    State(state): State<Arc<AppState>>,
    Path(dataset): Path<String>,
    Json(records): Json<Vec<Record>>,
) -> Result<&'static str, ApiError> {
    let service = Arc::clone(&state.service);
    let name = dataset.clone();

    // Engine work is CPU bound and holds the dataset lane.
    let outcome = tokio::task::spawn_blocking(move || service.ingest(&name, records, now_ms()))
        .await
        .map_err(|e| {
            error!("Ingestion task for {} failed: {}", dataset, e);
            ApiError::Internal(e.to_string())
        })?;

    match outcome {
        Ok(outcome) => {
            if let IngestOutcome::Computed(report) = outcome {
                debug!("Dataset {} cycle: {:?}", dataset, report);
            }
            Ok("ok")
        }
        Err(e) => {
            warn!("Rejected batch for {}: {}", dataset, e);
            Err(e.into())
        }
    }
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let metrics = state.service.encode_metrics().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        ApiError::Internal(e.to_string())
    })?;
    Ok((
        StatusCode::OK,
        [("Content-Type", prometheus::TEXT_FORMAT)],
        metrics,
    )
        .into_response())
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>RiskWatch Exporter</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        h1 { color: #2c3e50; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>RiskWatch Exporter</h1>
    <p>Rolling-window drift monitoring for model input data.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div><code>POST /iterate/{dataset}</code> - Ingest a JSON array of records</div>
        <div><a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div><a href="/health">/health</a> - Health check</div>
        <div><a href="/ready">/ready</a> - Readiness check</div>
        <div><a href="/status">/status</a> - Dataset status (JSON)</div>
    </div>
</body>
</html>"#,
    )
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// The service is built before the router, so a running server is ready.
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, "Ready")
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    window_size: usize,
    calculation_period_sec: u64,
    datasets: Vec<DatasetStatus>,
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let options = state.service.options();
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        window_size: options.window_size,
        calculation_period_sec: options.calculation_period_sec,
        datasets: state.service.status(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use riskwatch::{
        ColumnMapping, DatasetRegistration, DriftEngine, EngineError, MetricSample,
        MonitoringService, ServiceOptions, SummaryEngine, Table,
    };
    use tower::ServiceExt;

    struct FailingEngine;

    impl DriftEngine for FailingEngine {
        fn supports(&self, _monitor: &str) -> bool {
            true
        }

        fn compute(
            &self,
            _reference: &Table,
            _current: &Table,
            _mapping: &ColumnMapping,
            _monitors: &[String],
        ) -> Result<Vec<MetricSample>, EngineError> {
            Err(EngineError::Failed("engine offline".to_string()))
        }
    }

    fn app_with(window_size: usize, engine: Arc<dyn DriftEngine>) -> Router {
        let dataset = DatasetRegistration::new(
            "maternal-health-risk",
            Table::new(vec![Record::new().with("Age", 30.0)]),
            vec!["data_quality".to_string()],
            ColumnMapping {
                numerical_features: vec!["Age".to_string()],
                ..Default::default()
            },
        );
        let options = ServiceOptions {
            window_size,
            ..Default::default()
        };
        let service = MonitoringService::initialize(options, vec![dataset], engine).unwrap();
        router(AppState::new(service))
    }

    fn app() -> Router {
        app_with(2, Arc::new(SummaryEngine::new()))
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_iterate_ok() {
        let response = app()
            .oneshot(post("/iterate/maternal-health-risk", r#"[{"Age": 25}]"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_iterate_unknown_dataset() {
        let response = app()
            .oneshot(post("/iterate/unknown", r#"[{"Age": 25}]"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"error": "DatasetNotFound", "dataset": "unknown"})
        );
    }

    #[tokio::test]
    async fn test_iterate_empty_batch() {
        let response = app()
            .oneshot(post("/iterate/maternal-health-risk", "[]"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_iterate_malformed_body() {
        let response = app()
            .oneshot(post("/iterate/maternal-health-risk", r#"{"Age": 25}"#))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_iterate_engine_failure() {
        let response = app_with(1, Arc::new(FailingEngine))
            .oneshot(post("/iterate/maternal-health-risk", r#"[{"Age": 25}]"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], "EngineFailure");
        assert_eq!(body["message"], "Computation failed: engine offline");
    }

    #[tokio::test]
    async fn test_metrics_after_full_window() {
        let app = app();
        let response = app
            .clone()
            .oneshot(post(
                "/iterate/maternal-health-risk",
                r#"[{"Age": 20}, {"Age": 30}]"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_req("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains(
            "riskwatch:data_quality:mean{dataset_name=\"maternal-health-risk\",feature=\"Age\",slice=\"current\"} 25"
        ));
        assert!(body.contains("riskwatch_computations_total"));
    }

    #[tokio::test]
    async fn test_status() {
        let app = app();
        app.clone()
            .oneshot(post("/iterate/maternal-health-risk", r#"[{"Age": 20}]"#))
            .await
            .unwrap();

        let response = app.oneshot(get_req("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["window_size"], 2);
        assert_eq!(body["datasets"][0]["name"], "maternal-health-risk");
        assert_eq!(body["datasets"][0]["window_len"], 1);
        assert_eq!(body["datasets"][0]["busy"], false);
    }

    #[tokio::test]
    async fn test_health_and_ready() {
        let app = app();
        let response = app.clone().oneshot(get_req("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.clone().oneshot(get_req("/ready")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = app.oneshot(get_req("/")).await.unwrap();
        assert!(body_string(response).await.contains("RiskWatch Exporter"));
    }
}
