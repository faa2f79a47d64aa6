//! Hourly weather projection for the forecast horizon.
//!
//! The projection is deliberately simple: the latest real observation (or a
//! generic profile when none exists) carried forward with a 24-hour diurnal
//! sinusoid and bounded jitter. One series is synthesized per forecast call
//! and shared across every pollutant.

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::WeatherSample;

/// Humidity stays inside this band after jitter.
pub const HUMIDITY_BOUNDS: (f64, f64) = (20.0, 90.0);
/// Cloud cover stays inside this band after jitter.
pub const CLOUD_BOUNDS: (f64, f64) = (0.0, 100.0);

/// One synthesized hour of weather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub timestamp: DateTime<Utc>,
    pub temperature_c: f64,
    pub humidity_percent: f64,
    pub wind_speed_ms: f64,
    pub pressure_hpa: f64,
    pub cloud_cover_percent: f64,
}

/// Diurnal phase in [-1, 1], peaking mid-afternoon (~15:00).
pub fn diurnal(hour: u32) -> f64 {
    ((f64::from(hour) - 9.0) / 24.0 * std::f64::consts::TAU).sin()
}

/// Generic profile used when no current observation exists.
fn generic_base() -> WeatherSample {
    WeatherSample {
        location: crate::domain::GeoLocation::new(0.0, 0.0),
        timestamp: Utc::now(),
        temperature_c: 15.0,
        humidity_percent: 60.0,
        wind_speed_ms: 3.0,
        pressure_hpa: 1013.0,
        cloud_cover_percent: 40.0,
    }
}

/// Synthesize one hour-by-hour series for `horizon_hours` starting at
/// `start`, anchored on `current` when available.
pub fn synthesize_series<R: Rng>(
    start: DateTime<Utc>,
    horizon_hours: usize,
    current: Option<&WeatherSample>,
    rng: &mut R,
) -> Vec<HourlyWeather> {
    let base = current.cloned().unwrap_or_else(generic_base);

    (0..horizon_hours)
        .map(|h| {
            let timestamp = start + Duration::hours(h as i64);
            let phase = diurnal(timestamp.hour());

            let temperature_c =
                base.temperature_c + 5.0 * phase + rng.gen_range(-0.5..=0.5);
            let humidity_percent = (base.humidity_percent - 12.0 * phase
                + rng.gen_range(-2.0..=2.0))
            .clamp(HUMIDITY_BOUNDS.0, HUMIDITY_BOUNDS.1);
            let wind_speed_ms = (base.wind_speed_ms + rng.gen_range(-0.6..=0.6)).max(0.0);
            let pressure_hpa = base.pressure_hpa + rng.gen_range(-0.8..=0.8);
            let cloud_cover_percent = (base.cloud_cover_percent
                + rng.gen_range(-6.0..=6.0))
            .clamp(CLOUD_BOUNDS.0, CLOUD_BOUNDS.1);

            HourlyWeather {
                timestamp,
                temperature_c,
                humidity_percent,
                wind_speed_ms,
                pressure_hpa,
                cloud_cover_percent,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoLocation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn observation(humidity: f64, cloud: f64) -> WeatherSample {
        WeatherSample {
            location: GeoLocation::new(59.3, 18.0),
            timestamp: Utc::now(),
            temperature_c: 20.0,
            humidity_percent: humidity,
            wind_speed_ms: 4.0,
            pressure_hpa: 1015.0,
            cloud_cover_percent: cloud,
        }
    }

    #[test]
    fn produces_one_point_per_hour() {
        let mut rng = StdRng::seed_from_u64(7);
        let series = synthesize_series(Utc::now(), 48, None, &mut rng);
        assert_eq!(series.len(), 48);
        for pair in series.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::hours(1));
        }
    }

    #[test]
    fn humidity_and_cloud_respect_bounds_even_from_extreme_bases() {
        let mut rng = StdRng::seed_from_u64(7);
        let series = synthesize_series(Utc::now(), 72, Some(&observation(99.0, 100.0)), &mut rng);
        for point in &series {
            assert!((20.0..=90.0).contains(&point.humidity_percent));
            assert!((0.0..=100.0).contains(&point.cloud_cover_percent));
            assert!(point.wind_speed_ms >= 0.0);
        }

        let series = synthesize_series(Utc::now(), 72, Some(&observation(5.0, 0.0)), &mut rng);
        for point in &series {
            assert!((20.0..=90.0).contains(&point.humidity_percent));
            assert!((0.0..=100.0).contains(&point.cloud_cover_percent));
        }
    }

    #[test]
    fn anchors_on_the_current_observation() {
        let mut rng = StdRng::seed_from_u64(7);
        let current = observation(60.0, 40.0);
        let series = synthesize_series(Utc::now(), 24, Some(&current), &mut rng);
        for point in &series {
            // Diurnal swing is ±5 °C plus ±0.5 jitter around the anchor.
            assert!((point.temperature_c - current.temperature_c).abs() <= 5.6);
        }
    }

    #[test]
    fn same_seed_gives_identical_series() {
        let start = Utc::now();
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(
            synthesize_series(start, 24, None, &mut a),
            synthesize_series(start, 24, None, &mut b)
        );
    }

    #[test]
    fn diurnal_peaks_in_the_afternoon() {
        assert!(diurnal(15) > 0.95);
        assert!(diurnal(3) < -0.95);
        assert!(diurnal(9).abs() < 1e-9);
    }
}
