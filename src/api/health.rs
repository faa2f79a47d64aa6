use axum::{extract::State, Json};
use serde::Serialize;

use crate::aqi::TABLE_VERSION;
use crate::controller::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub breakpoint_table_version: &'static str,
    pub monitoring: bool,
}

/// GET /api/v1/health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        breakpoint_table_version: TABLE_VERSION,
        monitoring: state.scheduler.is_running(),
    })
}
