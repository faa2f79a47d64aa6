//! Storage boundary.
//!
//! The pipeline only ever talks to these traits; ingestion collaborators
//! deposit samples through them and tests substitute deterministic
//! fixtures. The default store is in-memory; Postgres sits behind the
//! `db` cargo feature.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::domain::{AlertRecord, GeoBox, Pollutant, Sample, Severity, WeatherSample};

pub mod memory;
#[cfg(feature = "db")]
pub mod pg;

/// Read/write access to pollutant concentration samples.
#[async_trait]
pub trait SampleRepository: Send + Sync {
    async fn insert(&self, sample: Sample) -> Result<()>;

    /// Samples for one pollutant inside a bounding box, `since` onwards,
    /// ordered by timestamp ascending.
    async fn find_samples(
        &self,
        pollutant: Pollutant,
        area: &GeoBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sample>>;

    /// Most recent sample of any pollutant inside the box.
    async fn find_latest(&self, area: &GeoBox) -> Result<Option<Sample>>;
}

/// Read/write access to weather observations.
#[async_trait]
pub trait WeatherRepository: Send + Sync {
    async fn insert(&self, sample: WeatherSample) -> Result<()>;

    async fn find_weather(
        &self,
        area: &GeoBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<WeatherSample>>;

    async fn find_latest(&self, area: &GeoBox) -> Result<Option<WeatherSample>>;
}

/// Persisted alert records.
#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn create(&self, alert: AlertRecord) -> Result<AlertRecord>;

    /// Newest active alert matching location and severity created at or
    /// after `since`; the dedup probe.
    async fn find_recent(
        &self,
        location_id: &str,
        severity: Severity,
        since: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>>;

    async fn find_active(&self) -> Result<Vec<AlertRecord>>;

    /// Mark every active alert whose TTL has passed as expired. Returns
    /// the number of records transitioned.
    async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Bundle of repository handles wired from configuration.
pub struct Repositories {
    pub samples: Arc<dyn SampleRepository>,
    pub weather: Arc<dyn WeatherRepository>,
    pub alerts: Arc<dyn AlertRepository>,
}

impl Repositories {
    pub async fn new(cfg: &Config) -> Result<Self> {
        #[cfg(feature = "db")]
        if let Some(url) = cfg.db.as_ref().map(|db| db.url.as_str()) {
            let pool = pg::connect(url).await?;
            return Ok(Self {
                samples: Arc::new(pg::PgSampleRepository::new(pool.clone())),
                weather: Arc::new(pg::PgWeatherRepository::new(pool.clone())),
                alerts: Arc::new(pg::PgAlertRepository::new(pool)),
            });
        }

        let _ = cfg;
        Ok(Self::in_memory())
    }

    /// Fresh in-memory stores; also the test fixture entry point.
    pub fn in_memory() -> Self {
        Self {
            samples: Arc::new(memory::InMemorySampleRepository::default()),
            weather: Arc::new(memory::InMemoryWeatherRepository::default()),
            alerts: Arc::new(memory::InMemoryAlertRepository::default()),
        }
    }
}
