pub mod alerts;
pub mod error;
pub mod forecast;
pub mod health;
pub mod monitor;
pub mod response;

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, controller::AppState};

pub fn router(state: AppState, cfg: &Config) -> Router {
    let mut router = Router::new().nest("/api/v1", v1_routes(state));

    if cfg.server.enable_cors {
        use tower_http::cors::CorsLayer;
        let cors = CorsLayer::new()
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers([axum::http::header::CONTENT_TYPE]);
        router = router.layer(cors);
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(1024 * 1024))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    cfg.server.request_timeout_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
}

fn v1_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/forecast/:location_id", get(forecast::get_forecast))
        .route("/alerts/active", get(alerts::active_alerts))
        .route("/monitor/start", post(monitor::start))
        .route("/monitor/stop", post(monitor::stop))
        .route("/monitor/status", get(monitor::status))
        .with_state(state)
}
