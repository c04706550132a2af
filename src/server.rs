//! HTTP transport for the monitor.
//!
//! This module exposes [`Monitor`] operations as JSON endpoints:
//! - `GET  /health`, `GET /api/status`
//! - `GET  /api/environment` (advances the simulation), `GET /api/sensors/:channel` (does not)
//! - `POST /api/logger/start`, `POST /api/logger/stop`, `GET /api/logs`
//! - `POST /api/targets`
//!
//! # Architecture
//!
//! ```text
//! client ──→ axum router ──→ Monitor ──→ SensorBank
//!                               │
//!                               └──→ LogSession ──→ background task ──→ ./logs/*.csv
//! ```

use crate::logging::{SessionError, StopOutcome};
use crate::monitor::{ChannelReading, LogListing, MonitorStatus, Report, SharedMonitor};
use crate::sensors::{Channel, TargetReport};
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Address to bind to
    pub bind: IpAddr,
}

impl ServerConfig {
    /// Listen on localhost at `port`.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    pub fn with_bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
        }),
    )
}

/// Body of a start request. `patient_id` is accepted for older clients.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(alias = "patient_id")]
    pub session_id: Option<String>,
}

/// Response from the start endpoint
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub status: String,
    pub session_id: String,
    pub file: PathBuf,
}

/// Response from the targets endpoint
#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    pub status: String,
    #[serde(flatten)]
    pub report: TargetReport,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/status
async fn status(State(monitor): State<SharedMonitor>) -> Json<MonitorStatus> {
    Json(monitor.status())
}

/// GET /api/environment
async fn environment(State(monitor): State<SharedMonitor>) -> Json<Report> {
    let report = monitor.poll_report();
    tracing::debug!(worst = %report.worst_alarm(), "environment polled");
    Json(report)
}

/// GET /api/sensors/:channel
async fn sensor(
    State(monitor): State<SharedMonitor>,
    Path(channel): Path<String>,
) -> Result<Json<ChannelReading>, ApiError> {
    let channel: Channel = channel
        .parse()
        .map_err(|e| api_error(StatusCode::NOT_FOUND, "UNKNOWN_CHANNEL", e))?;
    Ok(Json(monitor.peek_channel(channel)))
}

/// POST /api/logger/start
async fn logger_start(
    State(monitor): State<SharedMonitor>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let session_id = request.session_id.unwrap_or_default();

    let started = monitor.start_session(&session_id).await.map_err(|e| {
        let code = match e {
            SessionError::Configuration(_) => "LOG_DIR_UNAVAILABLE",
            SessionError::Io(_) => "LOG_OPEN_FAILED",
        };
        api_error(StatusCode::INTERNAL_SERVER_ERROR, code, e)
    })?;

    Ok(Json(StartResponse {
        status: "started".to_string(),
        session_id: started.session_id,
        file: started.file,
    }))
}

/// POST /api/logger/stop
async fn logger_stop(State(monitor): State<SharedMonitor>) -> Json<StopOutcome> {
    Json(monitor.stop_session().await)
}

/// POST /api/targets
///
/// Each known channel field is validated on its own. Fields that are not
/// numbers or name no channel are reported as skipped; the rest apply.
async fn targets(
    State(monitor): State<SharedMonitor>,
    Json(body): Json<serde_json::Map<String, serde_json::Value>>,
) -> Json<TargetsResponse> {
    let mut rejected = TargetReport::default();
    let mut updates = Vec::with_capacity(body.len());

    for (field, value) in &body {
        let channel = match field.parse::<Channel>() {
            Ok(channel) => channel,
            Err(e) => {
                rejected.skip(field.as_str(), e);
                continue;
            }
        };
        match value.as_f64() {
            Some(v) => updates.push((channel, v)),
            None => rejected.skip(field.as_str(), "target must be a number"),
        }
    }

    let mut report = monitor.set_targets(&updates);
    report.skipped.extend(rejected.skipped);
    Json(TargetsResponse {
        status: "ok".to_string(),
        report,
    })
}

/// GET /api/logs
async fn logs(State(monitor): State<SharedMonitor>) -> Result<Json<LogListing>, ApiError> {
    monitor
        .list_log_files()
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, "LOG_DIR_UNREADABLE", e))
}

/// Build the router over a shared monitor.
pub fn router(monitor: SharedMonitor) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/environment", get(environment))
        .route("/api/sensors/:channel", get(sensor))
        .route("/api/logger/start", post(logger_start))
        .route("/api/logger/stop", post(logger_stop))
        .route("/api/targets", post(targets))
        .route("/api/logs", get(logs))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .with_state(monitor)
}

/// Run the HTTP server.
///
/// Returns the bound address and a sender that shuts the server down. Any
/// running session is stopped once the server has drained.
pub async fn run(
    config: ServerConfig,
    monitor: SharedMonitor,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(monitor.clone());

    let addr = SocketAddr::new(config.bind, config.port);
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Incubator monitor listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
        if let StopOutcome::Stopped { session_id, .. } = monitor.stop_session().await {
            tracing::info!(session_id = %session_id, "stopped session on shutdown");
        }
    });

    Ok((actual_addr, shutdown_tx))
}
