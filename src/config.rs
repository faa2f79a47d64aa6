use std::net::SocketAddr;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::alerts::AlertConfig;
use crate::domain::{GeoLocation, MonitoredLocation};
use crate::forecast::ForecastConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub weather_api: WeatherApiConfig,
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
    #[cfg(feature = "db")]
    #[serde(default)]
    pub db: Option<DbConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub enable_cors: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Minutes between full monitoring sweeps.
    pub sweep_interval_minutes: u64,
    /// Minutes between alert-expiry sweeps.
    pub expiry_interval_minutes: u64,
    /// Start sweeping on boot; otherwise wait for the start endpoint.
    pub autostart: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_minutes: 20,
            expiry_interval_minutes: 60,
            autostart: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherApiConfig {
    pub enabled: bool,
    pub base_url: String,
    pub http_timeout_seconds: u64,
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.open-meteo.com".to_string(),
            http_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    pub id: String,
    pub name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Degrees in every direction defining the sample lookup box.
    pub half_extent_deg: f64,
}

impl LocationConfig {
    pub fn to_monitored(&self) -> MonitoredLocation {
        let mut center = GeoLocation::new(self.latitude, self.longitude);
        center.name = self.name.clone();
        MonitoredLocation::new(self.id.clone(), center, self.half_extent_deg)
    }
}

#[cfg(feature = "db")]
#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("AIRSENSE__").split("__"));
        Ok(figment.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_parses() {
        let cfg: Config = Figment::new()
            .merge(Toml::string(
                r#"
                [server]
                host = "127.0.0.1"
                port = 8080
                request_timeout_secs = 30
                enable_cors = false

                [scheduler]
                sweep_interval_minutes = 15
                expiry_interval_minutes = 30
                autostart = false

                [[locations]]
                id = "stockholm-center"
                name = "Stockholm"
                latitude = 59.3293
                longitude = 18.0686
                half_extent_deg = 0.25
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.scheduler.sweep_interval_minutes, 15);
        assert!(!cfg.scheduler.autostart);
        assert_eq!(cfg.locations.len(), 1);

        let monitored = cfg.locations[0].to_monitored();
        assert_eq!(monitored.id, "stockholm-center");
        assert!(monitored.area.contains(&GeoLocation::new(59.4, 18.0)));

        // Omitted sections fall back to defaults.
        assert_eq!(cfg.forecast.horizon_hours, 24);
        assert_eq!(cfg.alerts.dedup_minutes, 60);
        assert!(cfg.alerts.quiet_hours.enabled);
    }

    #[test]
    fn socket_addr_parses() {
        let server = ServerConfig {
            host: "0.0.0.0".into(),
            port: 9000,
            request_timeout_secs: 30,
            enable_cors: true,
        };
        assert_eq!(server.socket_addr().unwrap().port(), 9000);
    }
}
