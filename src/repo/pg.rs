#![cfg(feature = "db")]

//! Postgres-backed repositories.
//!
//! Queries are built at runtime so the crate compiles without a live
//! database. Expected schema:
//!
//! ```sql
//! CREATE TABLE samples (
//!     id BIGSERIAL PRIMARY KEY,
//!     pollutant TEXT NOT NULL,
//!     value DOUBLE PRECISION NOT NULL,
//!     unit TEXT NOT NULL,
//!     latitude DOUBLE PRECISION NOT NULL,
//!     longitude DOUBLE PRECISION NOT NULL,
//!     ts TIMESTAMPTZ NOT NULL,
//!     quality TEXT NOT NULL,
//!     source TEXT NOT NULL
//! );
//! CREATE TABLE weather_samples (
//!     id BIGSERIAL PRIMARY KEY,
//!     latitude DOUBLE PRECISION NOT NULL,
//!     longitude DOUBLE PRECISION NOT NULL,
//!     ts TIMESTAMPTZ NOT NULL,
//!     temperature_c DOUBLE PRECISION NOT NULL,
//!     humidity_percent DOUBLE PRECISION NOT NULL,
//!     wind_speed_ms DOUBLE PRECISION NOT NULL,
//!     pressure_hpa DOUBLE PRECISION NOT NULL,
//!     cloud_cover_percent DOUBLE PRECISION NOT NULL
//! );
//! CREATE TABLE alerts (
//!     id UUID PRIMARY KEY,
//!     location_id TEXT NOT NULL,
//!     latitude DOUBLE PRECISION NOT NULL,
//!     longitude DOUBLE PRECISION NOT NULL,
//!     severity TEXT NOT NULL,
//!     index_value INTEGER NOT NULL,
//!     dominant TEXT NOT NULL,
//!     message TEXT NOT NULL,
//!     health_impact TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     status TEXT NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::domain::{
    AlertRecord, AlertStatus, ConcentrationUnit, GeoBox, GeoLocation, Pollutant, QualityFlag,
    Sample, SampleSource, Severity, WeatherSample,
};

use super::{AlertRepository, SampleRepository, WeatherRepository};

pub async fn connect(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to postgres")
}

fn parse<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("unrecognized {what} in database: {raw}"))
}

fn sample_from_row(row: &sqlx::postgres::PgRow) -> Result<Sample> {
    Ok(Sample {
        pollutant: parse::<Pollutant>(row.try_get("pollutant")?, "pollutant")?,
        value: row.try_get("value")?,
        unit: parse::<ConcentrationUnit>(row.try_get("unit")?, "unit")?,
        location: GeoLocation::new(row.try_get("latitude")?, row.try_get("longitude")?),
        timestamp: row.try_get("ts")?,
        quality: parse::<QualityFlag>(row.try_get("quality")?, "quality flag")?,
        source: parse::<SampleSource>(row.try_get("source")?, "sample source")?,
    })
}

fn weather_from_row(row: &sqlx::postgres::PgRow) -> Result<WeatherSample> {
    Ok(WeatherSample {
        location: GeoLocation::new(row.try_get("latitude")?, row.try_get("longitude")?),
        timestamp: row.try_get("ts")?,
        temperature_c: row.try_get("temperature_c")?,
        humidity_percent: row.try_get("humidity_percent")?,
        wind_speed_ms: row.try_get("wind_speed_ms")?,
        pressure_hpa: row.try_get("pressure_hpa")?,
        cloud_cover_percent: row.try_get("cloud_cover_percent")?,
    })
}

fn alert_from_row(row: &sqlx::postgres::PgRow) -> Result<AlertRecord> {
    Ok(AlertRecord {
        id: row.try_get("id")?,
        location_id: row.try_get("location_id")?,
        location: GeoLocation::new(row.try_get("latitude")?, row.try_get("longitude")?),
        severity: parse::<Severity>(row.try_get("severity")?, "severity")?,
        index_value: row.try_get::<i32, _>("index_value")? as u16,
        dominant: parse::<Pollutant>(row.try_get("dominant")?, "pollutant")?,
        message: row.try_get("message")?,
        health_impact: row.try_get("health_impact")?,
        created_at: row.try_get("created_at")?,
        status: parse::<AlertStatus>(row.try_get("status")?, "alert status")?,
        expires_at: row.try_get("expires_at")?,
    })
}

pub struct PgSampleRepository {
    pool: PgPool,
}

impl PgSampleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SampleRepository for PgSampleRepository {
    async fn insert(&self, sample: Sample) -> Result<()> {
        sqlx::query(
            "INSERT INTO samples \
             (pollutant, value, unit, latitude, longitude, ts, quality, source) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(sample.pollutant.to_string())
        .bind(sample.value)
        .bind(sample.unit.to_string())
        .bind(sample.location.latitude)
        .bind(sample.location.longitude)
        .bind(sample.timestamp)
        .bind(sample.quality.to_string())
        .bind(sample.source.to_string())
        .execute(&self.pool)
        .await
        .context("failed to insert sample")?;
        Ok(())
    }

    async fn find_samples(
        &self,
        pollutant: Pollutant,
        area: &GeoBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<Sample>> {
        let rows = sqlx::query(
            "SELECT pollutant, value, unit, latitude, longitude, ts, quality, source \
             FROM samples \
             WHERE pollutant = $1 AND ts >= $2 \
               AND latitude BETWEEN $3 AND $4 AND longitude BETWEEN $5 AND $6 \
             ORDER BY ts ASC",
        )
        .bind(pollutant.to_string())
        .bind(since)
        .bind(area.min_latitude)
        .bind(area.max_latitude)
        .bind(area.min_longitude)
        .bind(area.max_longitude)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch samples")?;

        rows.iter().map(sample_from_row).collect()
    }

    async fn find_latest(&self, area: &GeoBox) -> Result<Option<Sample>> {
        let row = sqlx::query(
            "SELECT pollutant, value, unit, latitude, longitude, ts, quality, source \
             FROM samples \
             WHERE latitude BETWEEN $1 AND $2 AND longitude BETWEEN $3 AND $4 \
             ORDER BY ts DESC LIMIT 1",
        )
        .bind(area.min_latitude)
        .bind(area.max_latitude)
        .bind(area.min_longitude)
        .bind(area.max_longitude)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch latest sample")?;

        row.as_ref().map(sample_from_row).transpose()
    }
}

pub struct PgWeatherRepository {
    pool: PgPool,
}

impl PgWeatherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeatherRepository for PgWeatherRepository {
    async fn insert(&self, sample: WeatherSample) -> Result<()> {
        sqlx::query(
            "INSERT INTO weather_samples \
             (latitude, longitude, ts, temperature_c, humidity_percent, wind_speed_ms, \
              pressure_hpa, cloud_cover_percent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(sample.location.latitude)
        .bind(sample.location.longitude)
        .bind(sample.timestamp)
        .bind(sample.temperature_c)
        .bind(sample.humidity_percent)
        .bind(sample.wind_speed_ms)
        .bind(sample.pressure_hpa)
        .bind(sample.cloud_cover_percent)
        .execute(&self.pool)
        .await
        .context("failed to insert weather sample")?;
        Ok(())
    }

    async fn find_weather(
        &self,
        area: &GeoBox,
        since: DateTime<Utc>,
    ) -> Result<Vec<WeatherSample>> {
        let rows = sqlx::query(
            "SELECT latitude, longitude, ts, temperature_c, humidity_percent, wind_speed_ms, \
                    pressure_hpa, cloud_cover_percent \
             FROM weather_samples \
             WHERE ts >= $1 \
               AND latitude BETWEEN $2 AND $3 AND longitude BETWEEN $4 AND $5 \
             ORDER BY ts ASC",
        )
        .bind(since)
        .bind(area.min_latitude)
        .bind(area.max_latitude)
        .bind(area.min_longitude)
        .bind(area.max_longitude)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch weather samples")?;

        rows.iter().map(weather_from_row).collect()
    }

    async fn find_latest(&self, area: &GeoBox) -> Result<Option<WeatherSample>> {
        let row = sqlx::query(
            "SELECT latitude, longitude, ts, temperature_c, humidity_percent, wind_speed_ms, \
                    pressure_hpa, cloud_cover_percent \
             FROM weather_samples \
             WHERE latitude BETWEEN $1 AND $2 AND longitude BETWEEN $3 AND $4 \
             ORDER BY ts DESC LIMIT 1",
        )
        .bind(area.min_latitude)
        .bind(area.max_latitude)
        .bind(area.min_longitude)
        .bind(area.max_longitude)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch latest weather sample")?;

        row.as_ref().map(weather_from_row).transpose()
    }
}

pub struct PgAlertRepository {
    pool: PgPool,
}

impl PgAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for PgAlertRepository {
    async fn create(&self, alert: AlertRecord) -> Result<AlertRecord> {
        sqlx::query(
            "INSERT INTO alerts \
             (id, location_id, latitude, longitude, severity, index_value, dominant, \
              message, health_impact, created_at, status, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(alert.id)
        .bind(&alert.location_id)
        .bind(alert.location.latitude)
        .bind(alert.location.longitude)
        .bind(alert.severity.to_string())
        .bind(i32::from(alert.index_value))
        .bind(alert.dominant.to_string())
        .bind(&alert.message)
        .bind(&alert.health_impact)
        .bind(alert.created_at)
        .bind(alert.status.to_string())
        .bind(alert.expires_at)
        .execute(&self.pool)
        .await
        .context("failed to insert alert")?;
        Ok(alert)
    }

    async fn find_recent(
        &self,
        location_id: &str,
        severity: Severity,
        since: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>> {
        let row = sqlx::query(
            "SELECT id, location_id, latitude, longitude, severity, index_value, dominant, \
                    message, health_impact, created_at, status, expires_at \
             FROM alerts \
             WHERE location_id = $1 AND severity = $2 AND created_at >= $3 AND status = 'active' \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(location_id)
        .bind(severity.to_string())
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .context("failed to probe recent alerts")?;

        row.as_ref().map(alert_from_row).transpose()
    }

    async fn find_active(&self) -> Result<Vec<AlertRecord>> {
        let rows = sqlx::query(
            "SELECT id, location_id, latitude, longitude, severity, index_value, dominant, \
                    message, health_impact, created_at, status, expires_at \
             FROM alerts WHERE status = 'active' ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch active alerts")?;

        rows.iter().map(alert_from_row).collect()
    }

    async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE alerts SET status = 'expired' WHERE status = 'active' AND expires_at <= $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .context("failed to expire alerts")?;
        Ok(result.rows_affected())
    }
}
