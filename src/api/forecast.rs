use axum::{
    extract::{Path, State},
    Json,
};

use crate::api::{error::ApiError, response::ApiResponse};
use crate::controller::AppState;
use crate::domain::ForecastBundle;

/// GET /api/v1/forecast/:location_id
///
/// Serves the forecast output contract for one monitored location,
/// generated on demand from the models the last sweep trained.
pub async fn get_forecast(
    State(state): State<AppState>,
    Path(location_id): Path<String>,
) -> Result<Json<ApiResponse<ForecastBundle>>, ApiError> {
    let location = state
        .find_location(&location_id)
        .ok_or_else(|| ApiError::NotFound(format!("location {location_id}")))?
        .clone();

    let bundle = state.engine.generate(&location).await?;
    Ok(Json(ApiResponse::success(bundle)))
}
