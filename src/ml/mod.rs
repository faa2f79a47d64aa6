//! Per-pollutant regression pipeline: feature extraction, training-data
//! assembly, and the polynomial model itself.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

pub mod features;
pub mod training;

pub use features::{build_training_data, TrainingRow, MAX_WEATHER_GAP_HOURS};
pub use training::{train, TrainedModel, MIN_TRAINING_ROWS};

/// Number of raw features fed to the regression.
pub const NUM_FEATURES: usize = 7;

/// The fixed feature set: time-of-day/week plus weather covariates.
/// Built fresh per training run, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub hour_of_day: f64,
    pub day_of_week: f64,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_ms: f64,
    pub pressure_hpa: f64,
    pub cloud_cover_percent: f64,
}

impl FeatureVector {
    pub fn new(
        timestamp: DateTime<Utc>,
        temperature_c: f64,
        humidity_percent: f64,
        wind_speed_ms: f64,
        pressure_hpa: f64,
        cloud_cover_percent: f64,
    ) -> Self {
        Self {
            hour_of_day: f64::from(timestamp.hour()),
            day_of_week: f64::from(timestamp.weekday().num_days_from_monday()),
            temperature_c,
            humidity_percent,
            wind_speed_ms,
            pressure_hpa,
            cloud_cover_percent,
        }
    }

    /// Scale each feature into roughly [0, 1] with fixed constants so the
    /// normal-equation solve stays well conditioned. The constants are part
    /// of the model contract: predict() applies the same scaling.
    pub fn normalized(&self) -> [f64; NUM_FEATURES] {
        [
            self.hour_of_day / 24.0,
            self.day_of_week / 7.0,
            self.temperature_c / 40.0,
            self.humidity_percent / 100.0,
            self.wind_speed_ms / 30.0,
            self.pressure_hpa / 1100.0,
            self.cloud_cover_percent / 100.0,
        ]
    }
}

/// In-sample fit quality. A confidence proxy, not a generalization claim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mse: f64,
    pub r2: f64,
    pub n_samples: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn feature_vector_extracts_time_fields() {
        // 2025-06-02 is a Monday.
        let ts = Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap();
        let fv = FeatureVector::new(ts, 21.0, 55.0, 4.0, 1013.0, 30.0);
        assert_eq!(fv.hour_of_day, 14.0);
        assert_eq!(fv.day_of_week, 0.0);
    }

    #[test]
    fn normalized_features_are_bounded() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 7, 23, 0, 0).unwrap();
        let fv = FeatureVector::new(ts, 35.0, 90.0, 12.0, 1030.0, 100.0);
        for v in fv.normalized() {
            assert!((0.0..=1.0).contains(&v), "{v} out of range");
        }
    }
}
