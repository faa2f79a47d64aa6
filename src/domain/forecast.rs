use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::types::{GeoLocation, Pollutant};

/// Category ladder for index values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IndexCategory {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl IndexCategory {
    pub fn from_index(index: u16) -> Self {
        match index {
            0..=50 => Self::Good,
            51..=100 => Self::Moderate,
            101..=150 => Self::UnhealthySensitive,
            151..=200 => Self::Unhealthy,
            201..=300 => Self::VeryUnhealthy,
            _ => Self::Hazardous,
        }
    }
}

/// One predicted concentration, in the pollutant's canonical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub pollutant: Pollutant,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// In [0, 1]; decays with the hour offset.
    pub confidence: f64,
}

/// Per-hour index rollup across all pollutants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPoint {
    pub timestamp: DateTime<Utc>,
    pub value: u16,
    pub category: IndexCategory,
    pub dominant: Pollutant,
    /// Per-pollutant index values; pollutants without a breakpoint table
    /// are absent.
    pub breakdown: BTreeMap<Pollutant, u16>,
}

/// Forecast output contract served to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub location_id: String,
    pub location: GeoLocation,
    pub generated_at: DateTime<Utc>,
    pub horizon_hours: u32,
    pub pollutants: BTreeMap<Pollutant, Vec<ForecastPoint>>,
    pub index: Vec<IndexPoint>,
    /// Overall confidence: mean of the hour-zero confidences.
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_ladder_boundaries() {
        assert_eq!(IndexCategory::from_index(0), IndexCategory::Good);
        assert_eq!(IndexCategory::from_index(50), IndexCategory::Good);
        assert_eq!(IndexCategory::from_index(51), IndexCategory::Moderate);
        assert_eq!(IndexCategory::from_index(100), IndexCategory::Moderate);
        assert_eq!(
            IndexCategory::from_index(101),
            IndexCategory::UnhealthySensitive
        );
        assert_eq!(IndexCategory::from_index(150), IndexCategory::UnhealthySensitive);
        assert_eq!(IndexCategory::from_index(151), IndexCategory::Unhealthy);
        assert_eq!(IndexCategory::from_index(200), IndexCategory::Unhealthy);
        assert_eq!(IndexCategory::from_index(201), IndexCategory::VeryUnhealthy);
        assert_eq!(IndexCategory::from_index(300), IndexCategory::VeryUnhealthy);
        assert_eq!(IndexCategory::from_index(301), IndexCategory::Hazardous);
        assert_eq!(IndexCategory::from_index(500), IndexCategory::Hazardous);
    }
}
