use axum::{extract::State, Json};

use crate::api::{error::ApiError, response::ApiResponse};
use crate::controller::AppState;
use crate::domain::AlertRecord;

/// GET /api/v1/alerts/active
pub async fn active_alerts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AlertRecord>>>, ApiError> {
    let alerts = state.repos.alerts.find_active().await?;
    Ok(Json(ApiResponse::success(alerts)))
}
