use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::response::ApiResponse;
use crate::controller::{AppState, TaskStatus};

#[derive(Debug, Serialize)]
pub struct MonitorToggleResponse {
    pub running: bool,
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct MonitorStatusResponse {
    pub running: bool,
    pub sweep: TaskStatus,
    pub expiry: TaskStatus,
}

/// POST /api/v1/monitor/start (idempotent).
pub async fn start(State(state): State<AppState>) -> Json<ApiResponse<MonitorToggleResponse>> {
    let changed = state.scheduler.start();
    Json(ApiResponse::success(MonitorToggleResponse {
        running: state.scheduler.is_running(),
        changed,
    }))
}

/// POST /api/v1/monitor/stop (idempotent).
pub async fn stop(State(state): State<AppState>) -> Json<ApiResponse<MonitorToggleResponse>> {
    let changed = state.scheduler.stop();
    Json(ApiResponse::success(MonitorToggleResponse {
        running: state.scheduler.is_running(),
        changed,
    }))
}

/// GET /api/v1/monitor/status
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<MonitorStatusResponse>> {
    Json(ApiResponse::success(MonitorStatusResponse {
        running: state.scheduler.is_running(),
        sweep: state.scheduler.sweep_status().await,
        expiry: state.scheduler.expiry_status().await,
    }))
}
