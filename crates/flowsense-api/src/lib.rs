use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use flow_core::{
    check_alerts, detect_anomalies, enrich_readings, signal_series, Alert, AlertThresholds,
    AnomalyParams, Reading, SensorCalibration, SensorRecord, Signal, Sink, Source,
};
use flow_ingest::{DeviceUdpDriver, MeterDriver};
use flow_sinks::FsSink;

const HISTORY_CAP: usize = 1000;

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    thresholds: AlertThresholds,
    calibration: SensorCalibration,
    latest: Mutex<Option<Reading>>,
    history: Mutex<Vec<Reading>>,
}

pub fn build_app(
    thresholds: AlertThresholds,
    calibration: SensorCalibration,
) -> (Router, Arc<AppState>) {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter()
        .with_registry(registry.clone())
        .build()
        .expect("prom exporter");
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("flowsense-api");

    let requests_total = meter
        .u64_counter("flowsense_requests_total")
        .with_description("Total HTTP requests served")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        thresholds,
        calibration,
        latest: Mutex::new(None),
        history: Mutex::new(Vec::with_capacity(256)),
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/current", get(current))
        .route("/api/v1/history", get(history))
        .route("/api/v1/usage", get(usage))
        .route("/api/v1/anomalies", get(anomalies))
        .route("/api/v1/alerts", get(alerts))
        .route("/ingest", post(ingest_report))
        .with_state(Arc::clone(&state));

    (router, state)
}

/// Run the UDP device-report listener, feeding readings into the shared
/// state and, when a directory is configured, a local JSONL log of
/// enriched readings.
pub async fn start_device_ingest(
    state: Arc<AppState>,
    bind: SocketAddr,
    sink_dir: Option<String>,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let (tx, rx) = oneshot::channel();
    let handle = tokio::spawn(async move {
        let mut driver = DeviceUdpDriver::new(bind);
        if let Err(e) = driver.start().await {
            tracing::error!(error=?e, "failed to start device driver");
            let _ = tx.send(Err(e.into()));
            return;
        }
        let local = driver.local_addr().unwrap_or(bind);
        let _ = tx.send(Ok(local));

        let mut fs_sink = match sink_dir {
            Some(dir) => match FsSink::new(dir) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::warn!(error=?e, "fs sink disabled");
                    None
                }
            },
            None => None,
        };

        let mut ledger = flow_core::UsageLedger::new(Local);
        loop {
            match driver.next_reading().await {
                Ok(raw) => {
                    let reading = state.calibration.apply(&raw);
                    inject_reading(&state, reading.clone()).await;
                    if let Some(sink) = fs_sink.as_mut() {
                        match ledger.push(&reading) {
                            Ok(enriched) => {
                                let _ = sink.emit(&enriched).await;
                            }
                            Err(e) => tracing::warn!(error=%e, "could not enrich reading"),
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error=?e, "ingest error");
                }
            }
        }
    });
    let local = rx
        .await
        .unwrap_or_else(|_| Err(anyhow::anyhow!("driver start channel closed")))?;
    Ok((local, handle))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

pub async fn inject_reading(state: &Arc<AppState>, reading: Reading) {
    {
        let mut latest = state.latest.lock().await;
        *latest = Some(reading.clone());
    }
    let mut hist = state.history.lock().await;
    hist.push(reading);
    if hist.len() > HISTORY_CAP {
        let overflow = hist.len() - HISTORY_CAP;
        hist.drain(0..overflow);
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.requests_total.add(1, &[]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

async fn current(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let latest = state.latest.lock().await;
    if let Some(reading) = latest.as_ref() {
        return (StatusCode::OK, Json(reading)).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = q.limit.unwrap_or(100).min(HISTORY_CAP);
    let hist = state.history.lock().await;
    let start = hist.len().saturating_sub(limit);
    let slice = hist[start..].to_vec();
    (StatusCode::OK, Json(slice)).into_response()
}

/// Enriched view of the history. The ledger runs over the whole retained
/// history so hourly/daily sums are correct, then the tail is returned.
async fn usage(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = q.limit.unwrap_or(100).min(HISTORY_CAP);
    let hist = state.history.lock().await;
    match enrich_readings(&hist, Local) {
        Ok(enriched) => {
            let start = enriched.len().saturating_sub(limit);
            (StatusCode::OK, Json(enriched[start..].to_vec())).into_response()
        }
        Err(e) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct AnomalyQuery {
    signal: Option<String>,
    window: Option<usize>,
    threshold: Option<f64>,
}

async fn anomalies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<AnomalyQuery>,
) -> impl IntoResponse {
    let signal: Signal = match q.signal.as_deref().unwrap_or("flow_rate").parse() {
        Ok(s) => s,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    };
    let defaults = AnomalyParams::default();
    let params = AnomalyParams {
        window: q.window.unwrap_or(defaults.window),
        threshold: q.threshold.unwrap_or(defaults.threshold),
    };

    let hist = state.history.lock().await;
    let enriched = match enrich_readings(&hist, Local) {
        Ok(e) => e,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    };
    let series = signal_series(&enriched, signal);
    match detect_anomalies(&series, &params) {
        Ok(flags) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "signal": signal,
                "window": params.window,
                "threshold": params.threshold,
                "flags": flags,
            })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

async fn alerts(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let hist = state.history.lock().await;
    let enriched = match enrich_readings(&hist, Local) {
        Ok(e) => e,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    };
    let triggered: Vec<Alert> = enriched
        .last()
        .map(|latest| check_alerts(latest, &state.thresholds, &Local))
        .unwrap_or_default();
    (StatusCode::OK, Json(triggered)).into_response()
}

/// Accept a device report in its raw JSON shape
async fn ingest_report(
    State(state): State<Arc<AppState>>,
    Json(record): Json<SensorRecord>,
) -> impl IntoResponse {
    state.requests_total.add(1, &[]);

    let reading = match Reading::try_from(record) {
        Ok(r) => r,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    };

    let reading = state.calibration.apply(&reading);
    inject_reading(&state, reading).await;

    (StatusCode::OK, Json(serde_json::json!({"status":"ok"}))).into_response()
}
