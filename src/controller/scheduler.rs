//! Periodic monitoring scheduler.
//!
//! One low-frequency loop sweeps every monitored location: refresh live
//! weather, retrain models, regenerate the forecast, evaluate alerts. A
//! second loop retires alerts past their TTL. Locations are processed
//! sequentially and fail independently; a per-location mutex guarantees at
//! most one in-flight sweep per location so the alert dedup
//! check-then-write can never race with itself.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};

use crate::alerts::AlertEvaluator;
use crate::config::SchedulerConfig;
use crate::domain::MonitoredLocation;
use crate::forecast::ForecastEngine;
use crate::ingest::WeatherApiClient;
use crate::repo::{AlertRepository, WeatherRepository};

/// Per-task run bookkeeping.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
}

pub struct MonitorScheduler {
    cfg: SchedulerConfig,
    locations: Vec<MonitoredLocation>,
    engine: Arc<ForecastEngine>,
    evaluator: Arc<AlertEvaluator>,
    weather_client: Option<WeatherApiClient>,
    weather_repo: Arc<dyn WeatherRepository>,
    alerts_repo: Arc<dyn AlertRepository>,
    running: AtomicBool,
    sweep_locks: HashMap<String, Arc<Mutex<()>>>,
    sweep_status: RwLock<TaskStatus>,
    expiry_status: RwLock<TaskStatus>,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl MonitorScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: SchedulerConfig,
        locations: Vec<MonitoredLocation>,
        engine: Arc<ForecastEngine>,
        evaluator: Arc<AlertEvaluator>,
        weather_client: Option<WeatherApiClient>,
        weather_repo: Arc<dyn WeatherRepository>,
        alerts_repo: Arc<dyn AlertRepository>,
    ) -> Self {
        let sweep_locks = locations
            .iter()
            .map(|l| (l.id.clone(), Arc::new(Mutex::new(()))))
            .collect();

        Self {
            cfg,
            locations,
            engine,
            evaluator,
            weather_client,
            weather_repo,
            alerts_repo,
            running: AtomicBool::new(false),
            sweep_locks,
            sweep_status: RwLock::new(TaskStatus::default()),
            expiry_status: RwLock::new(TaskStatus::default()),
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Start the periodic tasks. Idempotent: a second call while running
    /// is a logged no-op. Returns whether this call actually started them.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("monitoring already running, start ignored");
            return false;
        }

        let scheduler = self.clone();
        let sweep = tokio::spawn(async move { scheduler.run_sweep_task().await });
        let scheduler = self.clone();
        let expiry = tokio::spawn(async move { scheduler.run_expiry_task().await });

        let mut handles = self.handles.lock().expect("scheduler handle lock");
        handles.push(sweep);
        handles.push(expiry);

        info!(
            locations = %self.locations.iter().map(|l| l.id.as_str()).join(", "),
            sweep_interval_minutes = self.cfg.sweep_interval_minutes,
            "monitoring started"
        );
        true
    }

    /// Stop the periodic tasks. Idempotent like [`start`].
    pub fn stop(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("monitoring not running, stop ignored");
            return false;
        }
        for handle in self.handles.lock().expect("scheduler handle lock").drain(..) {
            handle.abort();
        }
        info!("monitoring stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn sweep_status(&self) -> TaskStatus {
        self.sweep_status.read().await.clone()
    }

    pub async fn expiry_status(&self) -> TaskStatus {
        self.expiry_status.read().await.clone()
    }

    async fn run_sweep_task(&self) {
        let mut ticker = interval(Duration::from_secs(
            self.cfg.sweep_interval_minutes.max(1) * 60,
        ));
        loop {
            ticker.tick().await;
            if !self.is_running() {
                break;
            }
            self.sweep_all().await;
        }
    }

    async fn run_expiry_task(&self) {
        let mut ticker = interval(Duration::from_secs(
            self.cfg.expiry_interval_minutes.max(1) * 60,
        ));
        loop {
            ticker.tick().await;
            if !self.is_running() {
                break;
            }
            self.expire_alerts().await;
        }
    }

    /// Run one sweep over every location. Failures are isolated: one
    /// location erroring out never stops the others, it just retries on
    /// the next cycle.
    pub async fn sweep_all(&self) {
        let now = Utc::now();
        {
            let mut status = self.sweep_status.write().await;
            status.last_run = Some(now);
            status.run_count += 1;
        }

        let mut failures = 0u32;
        for location in &self.locations {
            let Some(lock) = self.sweep_locks.get(&location.id) else {
                continue;
            };
            let Ok(_guard) = lock.try_lock() else {
                warn!(location = %location.id, "sweep already in flight, skipping");
                continue;
            };

            if let Err(e) = self.sweep_location(location).await {
                failures += 1;
                error!(
                    location = %location.id,
                    error = %e,
                    "sweep failed, location retries next cycle"
                );
            }
        }

        let mut status = self.sweep_status.write().await;
        if failures == 0 {
            status.last_success = Some(now);
            status.success_count += 1;
            status.last_error = None;
        } else {
            status.error_count += 1;
            status.last_error = Some(format!("{failures} location(s) failed"));
        }
    }

    async fn sweep_location(&self, location: &MonitoredLocation) -> anyhow::Result<()> {
        self.refresh_weather(location).await;

        let trained = self.engine.retrain(location).await?;
        let bundle = self.engine.generate(location).await?;
        debug!(
            location = %location.id,
            trained,
            index_points = bundle.index.len(),
            confidence = bundle.confidence,
            "forecast refreshed"
        );

        self.evaluator
            .evaluate_location(location, Utc::now())
            .await?;
        Ok(())
    }

    /// Best-effort live weather refresh. Any failure is a warning: the
    /// forecast engine synthesizes weather when no fresh observation lands.
    async fn refresh_weather(&self, location: &MonitoredLocation) {
        let Some(client) = &self.weather_client else {
            return;
        };
        match client.fetch_current(&location.center).await {
            Ok(sample) => {
                if let Err(e) = self.weather_repo.insert(sample).await {
                    warn!(location = %location.id, error = %e, "failed to store weather sample");
                }
            }
            Err(e) => {
                warn!(
                    location = %location.id,
                    error = %e,
                    "live weather fetch failed, forecasts fall back to synthesized weather"
                );
            }
        }
    }

    pub async fn expire_alerts(&self) {
        let now = Utc::now();
        {
            let mut status = self.expiry_status.write().await;
            status.last_run = Some(now);
            status.run_count += 1;
        }

        match self.alerts_repo.expire_due(now).await {
            Ok(expired) => {
                if expired > 0 {
                    info!(expired, "alerts expired");
                }
                let mut status = self.expiry_status.write().await;
                status.last_success = Some(now);
                status.success_count += 1;
                status.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "alert expiry sweep failed");
                let mut status = self.expiry_status.write().await;
                status.error_count += 1;
                status.last_error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertConfig, LoggingDispatcher};
    use crate::domain::{
        ConcentrationUnit, GeoLocation, Pollutant, QualityFlag, Sample, SampleSource,
    };
    use crate::forecast::ForecastConfig;
    use crate::repo::{AlertRepository, Repositories, SampleRepository};

    fn scheduler_with(repos: &Repositories) -> Arc<MonitorScheduler> {
        let locations = vec![MonitoredLocation::new(
            "loc-1",
            GeoLocation::new(59.3, 18.0),
            0.5,
        )];
        let engine = Arc::new(ForecastEngine::new(
            repos.samples.clone(),
            repos.weather.clone(),
            ForecastConfig {
                seed: Some(1),
                ..ForecastConfig::default()
            },
        ));
        let evaluator = Arc::new(AlertEvaluator::new(
            repos.samples.clone(),
            repos.alerts.clone(),
            Arc::new(LoggingDispatcher),
            AlertConfig {
                // Keep quiet hours out of the way for wall-clock tests.
                quiet_hours: crate::alerts::QuietHours {
                    enabled: false,
                    start_hour: 0,
                    end_hour: 0,
                },
                ..AlertConfig::default()
            },
        ));
        Arc::new(MonitorScheduler::new(
            SchedulerConfig::default(),
            locations,
            engine,
            evaluator,
            None,
            repos.weather.clone(),
            repos.alerts.clone(),
        ))
    }

    fn polluted_sample() -> Sample {
        Sample {
            pollutant: Pollutant::Pm25,
            value: 60.0,
            unit: ConcentrationUnit::MicrogramsPerCubicMeter,
            location: GeoLocation::new(59.3, 18.0),
            timestamp: Utc::now(),
            quality: QualityFlag::Valid,
            source: SampleSource::GroundStation,
        }
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let repos = Repositories::in_memory();
        let scheduler = scheduler_with(&repos);

        assert!(scheduler.start());
        assert!(scheduler.is_running());
        assert!(!scheduler.start());

        assert!(scheduler.stop());
        assert!(!scheduler.is_running());
        assert!(!scheduler.stop());
    }

    #[tokio::test]
    async fn sweep_creates_an_alert_and_repeats_are_deduplicated() {
        let repos = Repositories::in_memory();
        repos.samples.insert(polluted_sample()).await.unwrap();
        let scheduler = scheduler_with(&repos);

        scheduler.sweep_all().await;
        assert_eq!(repos.alerts.find_active().await.unwrap().len(), 1);

        // Second sweep inside the dedup window: no new alert.
        scheduler.sweep_all().await;
        assert_eq!(repos.alerts.find_active().await.unwrap().len(), 1);

        let status = scheduler.sweep_status().await;
        assert_eq!(status.run_count, 2);
        assert_eq!(status.success_count, 2);
        assert_eq!(status.error_count, 0);
    }

    #[tokio::test]
    async fn in_flight_location_is_skipped_not_raced() {
        let repos = Repositories::in_memory();
        repos.samples.insert(polluted_sample()).await.unwrap();
        let scheduler = scheduler_with(&repos);

        // Hold the location's sweep lock to simulate an in-flight sweep.
        let lock = scheduler.sweep_locks.get("loc-1").unwrap().clone();
        let guard = lock.lock().await;

        scheduler.sweep_all().await;
        assert!(repos.alerts.find_active().await.unwrap().is_empty());

        drop(guard);
        scheduler.sweep_all().await;
        assert_eq!(repos.alerts.find_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn expiry_sweep_updates_status() {
        let repos = Repositories::in_memory();
        let scheduler = scheduler_with(&repos);

        scheduler.expire_alerts().await;
        let status = scheduler.expiry_status().await;
        assert_eq!(status.run_count, 1);
        assert_eq!(status.success_count, 1);
    }
}
