use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Pollutant parameters tracked by the pipeline.
///
/// Declaration order is the canonical evaluation order: index aggregation
/// resolves dominant-parameter ties to the first variant listed here.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Pollutant {
    Pm25,
    Pm10,
    No2,
    So2,
    O3,
    Co,
    Hcho,
}

/// Pollutant families sharing a weather-response profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollutantFamily {
    /// Combustion gases (NO2, SO2, CO): accumulate under high pressure and calm wind.
    CombustionGas,
    /// Particulates (PM2.5, PM10): accumulate in calm, humid air.
    Particulate,
    /// Ozone: photochemical, builds with temperature, suppressed by humidity.
    Ozone,
    /// Formaldehyde: temperature-driven off-gassing.
    Formaldehyde,
}

impl Pollutant {
    pub fn family(&self) -> PollutantFamily {
        match self {
            Pollutant::No2 | Pollutant::So2 | Pollutant::Co => PollutantFamily::CombustionGas,
            Pollutant::Pm25 | Pollutant::Pm10 => PollutantFamily::Particulate,
            Pollutant::O3 => PollutantFamily::Ozone,
            Pollutant::Hcho => PollutantFamily::Formaldehyde,
        }
    }

    /// Unit every stored concentration is normalized to before training,
    /// forecasting, and index lookup.
    pub fn canonical_unit(&self) -> ConcentrationUnit {
        match self {
            Pollutant::Pm25 | Pollutant::Pm10 | Pollutant::Hcho => {
                ConcentrationUnit::MicrogramsPerCubicMeter
            }
            Pollutant::No2 | Pollutant::So2 | Pollutant::O3 => ConcentrationUnit::PartsPerBillion,
            Pollutant::Co => ConcentrationUnit::PartsPerMillion,
        }
    }

    /// Typical background concentration in the canonical unit, used when a
    /// forecast is requested with no history at all.
    pub fn baseline(&self) -> f64 {
        match self {
            Pollutant::Pm25 => 12.0,
            Pollutant::Pm10 => 25.0,
            Pollutant::No2 => 20.0,
            Pollutant::So2 => 8.0,
            Pollutant::O3 => 30.0,
            Pollutant::Co => 0.5,
            Pollutant::Hcho => 3.0,
        }
    }
}

/// Concentration units accepted at the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConcentrationUnit {
    MicrogramsPerCubicMeter,
    MilligramsPerCubicMeter,
    PartsPerBillion,
    PartsPerMillion,
}

/// Geographic point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: None,
        }
    }
}

/// Axis-aligned bounding box used for repository lookups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl GeoBox {
    /// Box of `half_extent_deg` degrees in every direction around a center.
    pub fn around(center: &GeoLocation, half_extent_deg: f64) -> Self {
        Self {
            min_latitude: center.latitude - half_extent_deg,
            max_latitude: center.latitude + half_extent_deg,
            min_longitude: center.longitude - half_extent_deg,
            max_longitude: center.longitude + half_extent_deg,
        }
    }

    pub fn contains(&self, point: &GeoLocation) -> bool {
        point.latitude >= self.min_latitude
            && point.latitude <= self.max_latitude
            && point.longitude >= self.min_longitude
            && point.longitude <= self.max_longitude
    }
}

/// Where a sample came from. Ground stations are preferred over satellite
/// retrievals when both are available for the same window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SampleSource {
    GroundStation,
    Satellite,
}

/// Ingestion-time quality flag. Invalid samples never enter training or
/// alert evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QualityFlag {
    Valid,
    Estimated,
    Invalid,
}

/// One pollutant concentration measurement. Immutable once ingested;
/// superseded by newer samples, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub pollutant: Pollutant,
    pub value: f64,
    pub unit: ConcentrationUnit,
    pub location: GeoLocation,
    pub timestamp: DateTime<Utc>,
    pub quality: QualityFlag,
    pub source: SampleSource,
}

impl Sample {
    pub fn is_usable(&self) -> bool {
        self.quality != QualityFlag::Invalid && self.value.is_finite() && self.value >= 0.0
    }
}

/// A fixed monitored location the scheduler sweeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredLocation {
    pub id: String,
    pub center: GeoLocation,
    pub area: GeoBox,
}

impl MonitoredLocation {
    pub fn new(id: impl Into<String>, center: GeoLocation, half_extent_deg: f64) -> Self {
        let area = GeoBox::around(&center, half_extent_deg);
        Self {
            id: id.into(),
            center,
            area,
        }
    }
}

/// One meteorological observation, joined to pollutant samples by nearest
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub location: GeoLocation,
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_ms: f64,
    pub pressure_hpa: f64,
    pub cloud_cover_percent: f64,
}
