//! Training-data assembly: join pollutant samples with their
//! nearest-in-time weather observation.

use crate::aqi;
use crate::domain::{Pollutant, Sample, WeatherSample};

use super::FeatureVector;

/// A pollutant sample with no weather observation within this window is
/// excluded from training.
pub const MAX_WEATHER_GAP_HOURS: i64 = 6;

/// One regression row: features → target concentration (canonical unit).
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub pollutant: Pollutant,
    pub features: FeatureVector,
    pub target: f64,
}

/// Pure, deterministic join. Samples that are unusable, lack a close-enough
/// weather observation, or carry a unit that cannot be normalized are
/// silently dropped; that is expected attrition, not an error.
pub fn build_training_data(samples: &[Sample], weather: &[WeatherSample]) -> Vec<TrainingRow> {
    let max_gap_secs = MAX_WEATHER_GAP_HOURS * 3600;

    samples
        .iter()
        .filter(|s| s.is_usable())
        .filter_map(|sample| {
            let nearest = weather.iter().min_by_key(|w| {
                (w.timestamp - sample.timestamp).num_seconds().abs()
            })?;
            let gap = (nearest.timestamp - sample.timestamp).num_seconds().abs();
            if gap > max_gap_secs {
                return None;
            }

            let target = aqi::to_canonical(sample.pollutant, sample.value, sample.unit)?;
            let features = FeatureVector::new(
                sample.timestamp,
                nearest.temperature_c,
                nearest.humidity_percent,
                nearest.wind_speed_ms,
                nearest.pressure_hpa,
                nearest.cloud_cover_percent,
            );
            Some(TrainingRow {
                pollutant: sample.pollutant,
                features,
                target,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConcentrationUnit, GeoLocation, QualityFlag, SampleSource};
    use chrono::{Duration, TimeZone, Utc};

    fn sample(hours: i64, value: f64) -> Sample {
        let base = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        Sample {
            pollutant: Pollutant::Pm25,
            value,
            unit: ConcentrationUnit::MicrogramsPerCubicMeter,
            location: GeoLocation::new(59.3, 18.0),
            timestamp: base + Duration::hours(hours),
            quality: QualityFlag::Valid,
            source: SampleSource::GroundStation,
        }
    }

    fn weather(hours: i64, temperature_c: f64) -> WeatherSample {
        let base = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        WeatherSample {
            location: GeoLocation::new(59.3, 18.0),
            timestamp: base + Duration::hours(hours),
            temperature_c,
            humidity_percent: 60.0,
            wind_speed_ms: 3.0,
            pressure_hpa: 1013.0,
            cloud_cover_percent: 40.0,
        }
    }

    #[test]
    fn joins_nearest_weather_sample() {
        let samples = vec![sample(10, 15.0)];
        let weather = vec![weather(6, 5.0), weather(9, 8.0), weather(14, 11.0)];

        let rows = build_training_data(&samples, &weather);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].features.temperature_c, 8.0);
        assert_eq!(rows[0].target, 15.0);
    }

    #[test]
    fn drops_samples_beyond_the_six_hour_window() {
        let samples = vec![sample(0, 15.0), sample(20, 22.0)];
        let weather = vec![weather(13, 5.0)];

        let rows = build_training_data(&samples, &weather);
        // Only the second sample is within 6 h of the lone observation.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].target, 22.0);
    }

    #[test]
    fn exactly_six_hours_is_still_accepted() {
        let samples = vec![sample(6, 9.0)];
        let weather = vec![weather(0, 2.0)];

        let rows = build_training_data(&samples, &weather);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn drops_invalid_samples_and_empty_weather() {
        let mut bad = sample(1, 15.0);
        bad.quality = QualityFlag::Invalid;
        assert!(build_training_data(&[bad], &[weather(1, 5.0)]).is_empty());
        assert!(build_training_data(&[sample(1, 15.0)], &[]).is_empty());
    }

    #[test]
    fn normalizes_target_units() {
        let mut s = sample(1, 0.02);
        s.unit = ConcentrationUnit::MilligramsPerCubicMeter;
        let rows = build_training_data(&[s], &[weather(1, 5.0)]);
        assert_eq!(rows.len(), 1);
        assert!((rows[0].target - 20.0).abs() < 1e-9);
    }

    #[test]
    fn join_is_idempotent() {
        let samples = vec![sample(2, 10.0), sample(5, 12.0)];
        let weather = vec![weather(1, 3.0), weather(4, 6.0)];
        let a = build_training_data(&samples, &weather);
        let b = build_training_data(&samples, &weather);
        assert_eq!(a, b);
    }
}
