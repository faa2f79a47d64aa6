pub mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::alerts::{AlertEvaluator, LoggingDispatcher, NotificationDispatcher};
use crate::config::Config;
use crate::domain::MonitoredLocation;
use crate::forecast::ForecastEngine;
use crate::ingest::WeatherApiClient;
use crate::repo::Repositories;

pub use scheduler::{MonitorScheduler, TaskStatus};

#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub repos: Arc<Repositories>,
    pub engine: Arc<ForecastEngine>,
    pub scheduler: Arc<MonitorScheduler>,
    pub locations: Vec<MonitoredLocation>,
}

impl AppState {
    pub async fn new(cfg: Config) -> Result<Self> {
        let repos = Arc::new(Repositories::new(&cfg).await?);

        let engine = Arc::new(ForecastEngine::new(
            repos.samples.clone(),
            repos.weather.clone(),
            cfg.forecast.clone(),
        ));

        let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(LoggingDispatcher);
        let evaluator = Arc::new(AlertEvaluator::new(
            repos.samples.clone(),
            repos.alerts.clone(),
            dispatcher,
            cfg.alerts.clone(),
        ));

        let locations: Vec<MonitoredLocation> =
            cfg.locations.iter().map(|l| l.to_monitored()).collect();

        let weather_client = if cfg.weather_api.enabled {
            Some(WeatherApiClient::new(
                cfg.weather_api.base_url.clone(),
                Duration::from_secs(cfg.weather_api.http_timeout_seconds),
            )?)
        } else {
            None
        };

        let scheduler = Arc::new(MonitorScheduler::new(
            cfg.scheduler.clone(),
            locations.clone(),
            engine.clone(),
            evaluator,
            weather_client,
            repos.weather.clone(),
            repos.alerts.clone(),
        ));

        Ok(Self {
            cfg,
            repos,
            engine,
            scheduler,
            locations,
        })
    }

    pub fn find_location(&self, id: &str) -> Option<&MonitoredLocation> {
        self.locations.iter().find(|l| l.id == id)
    }
}

/// Kick off the monitoring scheduler when configured to start on boot.
pub fn spawn_controller_tasks(state: &AppState) {
    if state.cfg.scheduler.autostart {
        state.scheduler.start();
    } else {
        info!("scheduler autostart disabled, waiting for start request");
    }
}
