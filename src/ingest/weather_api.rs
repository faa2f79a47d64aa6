//! Live weather ingestion (Open-Meteo).
//!
//! The sweep refreshes the current observation for each monitored location
//! through this client. A timeout or network failure here is logged as a
//! warning and the forecast falls back to synthesized weather; it never
//! blocks a sweep.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{GeoLocation, WeatherSample};

pub struct WeatherApiClient {
    client: Client,
    base_url: String,
}

impl WeatherApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .context("failed to build weather HTTP client")?,
            base_url: base_url.into(),
        })
    }

    /// Fetch the current observation for a location.
    pub async fn fetch_current(&self, location: &GeoLocation) -> Result<WeatherSample> {
        let url = format!(
            "{}/v1/forecast?latitude={:.4}&longitude={:.4}\
             &current=temperature_2m,relative_humidity_2m,wind_speed_10m,surface_pressure,cloud_cover\
             &windspeed_unit=ms&timeformat=unixtime",
            self.base_url, location.latitude, location.longitude
        );

        debug!(%url, "fetching current weather");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("failed to reach weather API")?;

        if !response.status().is_success() {
            anyhow::bail!("weather API error: {}", response.status());
        }

        let payload: OpenMeteoResponse = response
            .json()
            .await
            .context("failed to parse weather API response")?;

        parse_current(location.clone(), payload)
    }
}

fn parse_current(location: GeoLocation, payload: OpenMeteoResponse) -> Result<WeatherSample> {
    let current = payload.current;
    let timestamp = DateTime::<Utc>::from_timestamp(current.time, 0)
        .context("weather API returned an out-of-range timestamp")?;

    Ok(WeatherSample {
        location,
        timestamp,
        temperature_c: current.temperature_2m,
        humidity_percent: current.relative_humidity_2m,
        wind_speed_ms: current.wind_speed_10m,
        pressure_hpa: current.surface_pressure,
        cloud_cover_percent: current.cloud_cover,
    })
}

#[derive(Debug, Deserialize)]
struct OpenMeteoResponse {
    current: OpenMeteoCurrent,
}

#[derive(Debug, Deserialize)]
struct OpenMeteoCurrent {
    time: i64,
    temperature_2m: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    surface_pressure: f64,
    cloud_cover: f64,
}
