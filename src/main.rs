use airsense::{api, config::Config, controller, telemetry};
use anyhow::Result;
use axum::Router;
use telemetry::init_tracing;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    if cfg.locations.is_empty() {
        anyhow::bail!("no monitored locations configured; add at least one [[locations]] entry");
    }

    let app_state = controller::AppState::new(cfg.clone()).await?;
    let app: Router = api::router(app_state.clone(), &cfg);

    let addr = cfg.server.socket_addr()?;

    if cfg.server.host == "0.0.0.0" {
        warn!(
            "server binding to 0.0.0.0 - service will be accessible from the network; \
            bind to 127.0.0.1 unless behind a firewall/reverse proxy"
        );
    }

    info!(%addr, locations = cfg.locations.len(), "starting airsense");

    controller::spawn_controller_tasks(&app_state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
