//! In-memory repository implementations.
//!
//! The default store for single-node deployments and the deterministic
//! fixture used throughout the test suite.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::{
    AlertRecord, AlertStatus, GeoBox, Pollutant, Sample, Severity, WeatherSample,
};

use super::{AlertRepository, SampleRepository, WeatherRepository};

#[derive(Default)]
pub struct InMemorySampleRepository {
    samples: RwLock<Vec<Sample>>,
}

#[async_trait]
impl SampleRepository for InMemorySampleRepository {
    async fn insert(&self, sample: Sample) -> Result<()> {
        self.samples.write().await.push(sample);
        Ok(())
    }

    async fn find_samples(
        &self,
        pollutant: Pollutant,
        area: &GeoBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        let mut hits: Vec<Sample> = self
            .samples
            .read()
            .await
            .iter()
            .filter(|s| {
                s.pollutant == pollutant && s.timestamp >= since && area.contains(&s.location)
            })
            .cloned()
            .collect();
        hits.sort_by_key(|s| s.timestamp);
        Ok(hits)
    }

    async fn find_latest(&self, area: &GeoBox) -> Result<Option<Sample>> {
        Ok(self
            .samples
            .read()
            .await
            .iter()
            .filter(|s| area.contains(&s.location))
            .max_by_key(|s| s.timestamp)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryWeatherRepository {
    samples: RwLock<Vec<WeatherSample>>,
}

#[async_trait]
impl WeatherRepository for InMemoryWeatherRepository {
    async fn insert(&self, sample: WeatherSample) -> Result<()> {
        self.samples.write().await.push(sample);
        Ok(())
    }

    async fn find_weather(
        &self,
        area: &GeoBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<WeatherSample>> {
        let mut hits: Vec<WeatherSample> = self
            .samples
            .read()
            .await
            .iter()
            .filter(|w| w.timestamp >= since && area.contains(&w.location))
            .cloned()
            .collect();
        hits.sort_by_key(|w| w.timestamp);
        Ok(hits)
    }

    async fn find_latest(&self, area: &GeoBox) -> Result<Option<WeatherSample>> {
        Ok(self
            .samples
            .read()
            .await
            .iter()
            .filter(|w| area.contains(&w.location))
            .max_by_key(|w| w.timestamp)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryAlertRepository {
    alerts: RwLock<Vec<AlertRecord>>,
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn create(&self, alert: AlertRecord) -> Result<AlertRecord> {
        self.alerts.write().await.push(alert.clone());
        Ok(alert)
    }

    async fn find_recent(
        &self,
        location_id: &str,
        severity: Severity,
        since: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>> {
        Ok(self
            .alerts
            .read()
            .await
            .iter()
            .filter(|a| {
                a.location_id == location_id
                    && a.severity == severity
                    && a.created_at >= since
                    && a.status == AlertStatus::Active
            })
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn find_active(&self) -> Result<Vec<AlertRecord>> {
        let mut hits: Vec<AlertRecord> = self
            .alerts
            .read()
            .await
            .iter()
            .filter(|a| a.status == AlertStatus::Active)
            .cloned()
            .collect();
        hits.sort_by_key(|a| a.created_at);
        Ok(hits)
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut alerts = self.alerts.write().await;
        let mut expired = 0;
        for alert in alerts.iter_mut() {
            if alert.status == AlertStatus::Active && alert.is_expired(now) {
                alert.status = AlertStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }
}
