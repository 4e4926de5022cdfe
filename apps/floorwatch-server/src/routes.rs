use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use floorwatch_core::types::{LogEntry, Session, Zone};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::ledger::LedgerError;
use crate::metrics;
use crate::state::AppState;
use crate::supervisor::SupervisorError;
use crate::zones::ZoneConfigError;

#[derive(Serialize)]
struct ReadyResponse {
    status: &'static str,
    uptime_secs: u64,
    instance_id: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_response(status: StatusCode, code: &'static str, message: impl ToString) -> Response {
    (
        status,
        Json(ErrorBody {
            error: code,
            message: message.to_string(),
        }),
    )
        .into_response()
}

fn supervisor_conflict(err: SupervisorError) -> Response {
    let code = match err {
        SupervisorError::AlreadyRunning => "already_running",
        SupervisorError::NotRunning => "not_running",
        SupervisorError::NoZonesConfigured => "no_zones_configured",
    };
    error_response(StatusCode::BAD_REQUEST, code, err)
}

fn config_error(err: ZoneConfigError) -> Response {
    warn!(error = %err, "zone config store unreadable");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "config_unreadable", err)
}

fn storage_error(err: &LedgerError) -> Response {
    warn!(error = %err, "session store unavailable");
    error_response(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", err)
}

async fn health() -> &'static str {
    "ok"
}

async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        instance_id: state.instance_id().to_string(),
    })
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain")],
        metrics::gather(),
    )
}

async fn list_zones(State(state): State<AppState>) -> Response {
    match state.zones().read().await {
        Ok(config) => Json(config.zones).into_response(),
        Err(err) => config_error(err),
    }
}

#[derive(Serialize)]
struct PutZonesResponse {
    saved: usize,
}

async fn put_zones(State(state): State<AppState>, Json(zones): Json<Vec<Zone>>) -> Response {
    match state.zones().replace_zones(zones).await {
        Ok(saved) => {
            info!(saved, "zone configuration replaced");
            Json(PutZonesResponse { saved }).into_response()
        }
        Err(err) => config_error(err),
    }
}

#[derive(Deserialize, Default)]
struct StartWorkerRequest {
    stream_url: Option<String>,
}

#[derive(Serialize)]
struct StartWorkerResponse {
    started: bool,
}

async fn start_worker(
    State(state): State<AppState>,
    body: Option<Json<StartWorkerRequest>>,
) -> Response {
    let config = match state.zones().read().await {
        Ok(config) => config,
        Err(err) => return config_error(err),
    };
    let stream_url = body
        .and_then(|Json(body)| body.stream_url)
        .unwrap_or(config.stream_url);

    match state.supervisor().start(&stream_url, &config.zones) {
        Ok(()) => {
            metrics::WORKER_STARTS.inc();
            info!(%stream_url, "detection worker start requested");
            Json(StartWorkerResponse { started: true }).into_response()
        }
        Err(err) => supervisor_conflict(err),
    }
}

#[derive(Serialize)]
struct StopWorkerResponse {
    stopping: bool,
}

async fn stop_worker(State(state): State<AppState>) -> Response {
    match state.supervisor().stop() {
        Ok(()) => {
            info!("detection worker stop requested");
            Json(StopWorkerResponse { stopping: true }).into_response()
        }
        Err(err) => supervisor_conflict(err),
    }
}

#[derive(Serialize)]
struct WorkerStatusResponse {
    running: bool,
    state: &'static str,
}

async fn worker_status(State(state): State<AppState>) -> Json<WorkerStatusResponse> {
    let worker = state.supervisor().status();
    Json(WorkerStatusResponse {
        running: worker.is_running(),
        state: worker.as_str(),
    })
}

async fn worker_logs(State(state): State<AppState>) -> Json<Vec<LogEntry>> {
    Json(state.supervisor().logs())
}

async fn list_sessions(State(state): State<AppState>) -> Response {
    match state.ledger().list_sessions().await {
        Ok(sessions) => Json::<Vec<Session>>(sessions).into_response(),
        Err(err) => storage_error(&err),
    }
}

async fn open_session(State(state): State<AppState>, Path(zone_id): Path<i64>) -> Response {
    match state.ledger().open_session(zone_id).await {
        Ok(session) => {
            metrics::SESSION_EVENTS.with_label_values(&["opened"]).inc();
            (StatusCode::CREATED, Json(session)).into_response()
        }
        Err(err @ LedgerError::SessionAlreadyOpen(_)) => {
            metrics::SESSION_EVENTS
                .with_label_values(&["open_conflict"])
                .inc();
            error_response(StatusCode::BAD_REQUEST, "session_already_open", err)
        }
        Err(err @ LedgerError::Storage(_)) => storage_error(&err),
        // close-side condition; open never produces it
        Err(err @ LedgerError::NoOpenSession(_)) => {
            error_response(StatusCode::NOT_FOUND, "no_open_session", err)
        }
    }
}

async fn close_session(State(state): State<AppState>, Path(zone_id): Path<i64>) -> Response {
    match state.ledger().close_session(zone_id).await {
        Ok(session) => {
            metrics::SESSION_EVENTS.with_label_values(&["closed"]).inc();
            Json(session).into_response()
        }
        Err(err @ LedgerError::NoOpenSession(_)) => {
            metrics::SESSION_EVENTS
                .with_label_values(&["close_miss"])
                .inc();
            error_response(StatusCode::NOT_FOUND, "no_open_session", err)
        }
        Err(err @ LedgerError::Storage(_)) => storage_error(&err),
        // open-side condition; close never produces it
        Err(err @ LedgerError::SessionAlreadyOpen(_)) => {
            error_response(StatusCode::BAD_REQUEST, "session_already_open", err)
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/readyz", get(ready))
        .route("/metrics", get(metrics_handler))
        .route("/api/zones", get(list_zones).put(put_zones))
        .route("/api/worker/start", post(start_worker))
        .route("/api/worker/stop", post(stop_worker))
        .route("/api/worker/status", get(worker_status))
        .route("/api/worker/logs", get(worker_logs))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:zone_id/start", post(open_session))
        .route("/api/sessions/:zone_id/end", post(close_session))
        .with_state(state)
}
