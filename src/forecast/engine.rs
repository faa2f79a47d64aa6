//! Per-pollutant forecast generation.
//!
//! Prediction prefers a freshly trained regression model; when none exists
//! the engine degrades through a trend extrapolation of recent history and
//! finally a fixed baseline, so a forecast request never fails for lack of
//! data.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use strum::IntoEnumIterator;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::aqi;
use crate::domain::{
    ForecastBundle, ForecastPoint, MonitoredLocation, Pollutant, PollutantFamily, Sample,
};
use crate::ml::{self, build_training_data, FeatureVector, TrainedModel};
use crate::repo::{SampleRepository, WeatherRepository};

use super::aggregate::aggregate;
use super::weather::{diurnal, synthesize_series, HourlyWeather};

/// Weather adjustment multipliers stay inside this band.
pub const ADJUSTMENT_BOUNDS: (f64, f64) = (0.3, 2.0);

/// Confidence is capped here regardless of fit quality.
pub const CONFIDENCE_CAP: f64 = 0.95;

/// Confidence assigned to trend-based fallback forecasts.
const TREND_CONFIDENCE: f64 = 0.5;

/// Confidence assigned when no history exists at all.
const BASELINE_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Hours of forecast produced per request.
    pub horizon_hours: u32,
    /// Rolling window of samples used for training.
    pub training_window_days: i64,
    /// History window feeding the trend fallback.
    pub history_window_hours: i64,
    /// Fixed jitter seed; `None` derives one from location and wall-clock
    /// hour so identical sweeps produce identical forecasts.
    pub seed: Option<u64>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon_hours: 24,
            training_window_days: 30,
            history_window_hours: 24,
            seed: None,
        }
    }
}

/// Trains and serves per-(location, pollutant) models, and turns them into
/// forecast bundles. Models live only until the next retrain cycle.
pub struct ForecastEngine {
    samples: Arc<dyn SampleRepository>,
    weather: Arc<dyn WeatherRepository>,
    cfg: ForecastConfig,
    models: RwLock<HashMap<(String, Pollutant), TrainedModel>>,
}

impl ForecastEngine {
    pub fn new(
        samples: Arc<dyn SampleRepository>,
        weather: Arc<dyn WeatherRepository>,
        cfg: ForecastConfig,
    ) -> Self {
        Self {
            samples,
            weather,
            cfg,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuild every model for one location from the current rolling
    /// window. Pollutants that no longer reach the minimum row count lose
    /// their model (wholesale replacement, no incremental update).
    pub async fn retrain(&self, location: &MonitoredLocation) -> Result<usize> {
        let since = Utc::now() - Duration::days(self.cfg.training_window_days);
        let weather_samples = self.weather.find_weather(&location.area, since).await?;

        let mut trained = 0;
        for pollutant in Pollutant::iter() {
            let samples = self
                .samples
                .find_samples(pollutant, &location.area, since)
                .await?;
            let rows = build_training_data(&samples, &weather_samples);

            let mut models = self.models.write().await;
            match ml::train(pollutant, &rows) {
                Some(model) => {
                    debug!(
                        location = %location.id,
                        %pollutant,
                        r2 = model.metrics.r2,
                        n = model.metrics.n_samples,
                        "model trained"
                    );
                    models.insert((location.id.clone(), pollutant), model);
                    trained += 1;
                }
                None => {
                    models.remove(&(location.id.clone(), pollutant));
                }
            }
        }

        info!(location = %location.id, trained, "retrain cycle complete");
        Ok(trained)
    }

    pub async fn generate(&self, location: &MonitoredLocation) -> Result<ForecastBundle> {
        self.generate_at(location, Utc::now()).await
    }

    /// Generate the full bundle as of `now`. Split out from [`generate`]
    /// so tests can pin the clock.
    pub async fn generate_at(
        &self,
        location: &MonitoredLocation,
        now: DateTime<Utc>,
    ) -> Result<ForecastBundle> {
        let horizon = self.cfg.horizon_hours as usize;

        let current_weather = self.weather.find_latest(&location.area).await?;
        let mut rng = StdRng::seed_from_u64(self.jitter_seed(location, now));
        let series = synthesize_series(now, horizon, current_weather.as_ref(), &mut rng);

        let history_since = now - Duration::hours(self.cfg.history_window_hours);
        let models = self.models.read().await;

        let mut pollutants = BTreeMap::new();
        for pollutant in Pollutant::iter() {
            let model = models.get(&(location.id.clone(), pollutant));
            let points = match model {
                Some(model) => model_forecast(pollutant, model, &series),
                None => {
                    let history = self
                        .samples
                        .find_samples(pollutant, &location.area, history_since)
                        .await?;
                    fallback_forecast(pollutant, &history, &series)
                }
            };
            pollutants.insert(pollutant, points);
        }
        drop(models);

        let index = aggregate(&pollutants, horizon);
        let confidence = overall_confidence(&pollutants);

        Ok(ForecastBundle {
            location_id: location.id.clone(),
            location: location.center.clone(),
            generated_at: now,
            horizon_hours: self.cfg.horizon_hours,
            pollutants,
            index,
            confidence,
        })
    }

    /// Jitter seed: fixed when configured, otherwise derived from the
    /// location and the wall-clock hour. Re-running a sweep with identical
    /// inputs inside the same hour reproduces the exact same forecast.
    fn jitter_seed(&self, location: &MonitoredLocation, now: DateTime<Utc>) -> u64 {
        if let Some(seed) = self.cfg.seed {
            return seed;
        }
        let mut hasher = DefaultHasher::new();
        location.id.hash(&mut hasher);
        (now.timestamp() / 3600).hash(&mut hasher);
        hasher.finish()
    }
}

/// Model-backed path: regression output scaled by the family-specific
/// weather multiplier, clamped to a physical concentration.
fn model_forecast(
    pollutant: Pollutant,
    model: &TrainedModel,
    series: &[HourlyWeather],
) -> Vec<ForecastPoint> {
    let base_confidence = model.metrics.r2.clamp(0.0, 1.0);

    series
        .iter()
        .enumerate()
        .map(|(hour_offset, weather)| {
            let features = FeatureVector::new(
                weather.timestamp,
                weather.temperature_c,
                weather.humidity_percent,
                weather.wind_speed_ms,
                weather.pressure_hpa,
                weather.cloud_cover_percent,
            );
            let raw = model.predict(&features);
            let value = (raw * weather_adjustment(pollutant, weather)).max(0.0);

            ForecastPoint {
                pollutant,
                timestamp: weather.timestamp,
                value,
                confidence: confidence_at(base_confidence, hour_offset),
            }
        })
        .collect()
}

/// Family-specific weather adjustment multiplier, clamped to
/// [`ADJUSTMENT_BOUNDS`].
pub fn weather_adjustment(pollutant: Pollutant, weather: &HourlyWeather) -> f64 {
    let multiplier = match pollutant.family() {
        PollutantFamily::CombustionGas => {
            // High pressure traps emissions; calm air lets them build up,
            // with the full boost at zero wind.
            let pressure = (weather.pressure_hpa / 1013.0).clamp(0.8, 1.0);
            let calm = 1.0 + ((10.0 - weather.wind_speed_ms).max(0.0) / 10.0) * 0.5;
            pressure * calm
        }
        PollutantFamily::Particulate => {
            let calm = 1.0 + ((8.0 - weather.wind_speed_ms).max(0.0) / 8.0) * 0.5;
            let humid = 0.7 + 0.3 * (weather.humidity_percent / 100.0);
            calm * humid
        }
        PollutantFamily::Ozone => {
            let warm = 1.0 + (weather.temperature_c - 10.0).max(0.0) * 0.02;
            let dry = 1.0 - 0.3 * (weather.humidity_percent / 100.0);
            warm * dry
        }
        PollutantFamily::Formaldehyde => 1.0 + (weather.temperature_c - 5.0).max(0.0) * 0.015,
    };

    multiplier.clamp(ADJUSTMENT_BOUNDS.0, ADJUSTMENT_BOUNDS.1)
}

/// Confidence at an hour offset: base decayed by e^(-h/12), capped.
pub fn confidence_at(base: f64, hour_offset: usize) -> f64 {
    (base * (-(hour_offset as f64) / 12.0).exp()).min(CONFIDENCE_CAP)
}

/// Trend fallback: mean of the most recent ≤24 canonical readings plus a
/// linear trend, modulated by the diurnal sinusoid at 20 % of the mean.
/// With no history at all, a fixed per-pollutant baseline is used instead.
fn fallback_forecast(
    pollutant: Pollutant,
    history: &[Sample],
    series: &[HourlyWeather],
) -> Vec<ForecastPoint> {
    let mut readings: Vec<(DateTime<Utc>, f64)> = history
        .iter()
        .filter(|s| s.is_usable())
        .filter_map(|s| aqi::to_canonical(pollutant, s.value, s.unit).map(|v| (s.timestamp, v)))
        .collect();
    readings.sort_by_key(|(timestamp, _)| *timestamp);

    let window: Vec<f64> = readings
        .iter()
        .rev()
        .take(24)
        .rev()
        .map(|(_, value)| *value)
        .collect();

    if window.is_empty() {
        let baseline = pollutant.baseline();
        return series
            .iter()
            .map(|w| ForecastPoint {
                pollutant,
                timestamp: w.timestamp,
                value: baseline,
                confidence: BASELINE_CONFIDENCE,
            })
            .collect();
    }

    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let trend = if window.len() >= 2 {
        (window[window.len() - 1] - window[0]) / window.len() as f64
    } else {
        0.0
    };

    series
        .iter()
        .enumerate()
        .map(|(hour_offset, w)| {
            let phase = diurnal(w.timestamp.hour());
            let value =
                (mean + trend * hour_offset as f64 + 0.2 * mean * phase).max(0.0);
            ForecastPoint {
                pollutant,
                timestamp: w.timestamp,
                value,
                confidence: TREND_CONFIDENCE,
            }
        })
        .collect()
}

/// Bundle-level confidence: mean of the hour-zero confidences.
fn overall_confidence(pollutants: &BTreeMap<Pollutant, Vec<ForecastPoint>>) -> f64 {
    let first: Vec<f64> = pollutants
        .values()
        .filter_map(|points| points.first())
        .map(|p| p.confidence)
        .collect();
    if first.is_empty() {
        return 0.0;
    }
    first.iter().sum::<f64>() / first.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConcentrationUnit, GeoLocation, QualityFlag, SampleSource};
    use crate::ml::{ModelMetrics, TrainingRow};
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn hour(h: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 7, 0, 0, 0).unwrap() + Duration::hours(h)
    }

    fn weather_at(h: i64) -> HourlyWeather {
        HourlyWeather {
            timestamp: hour(h),
            temperature_c: 18.0,
            humidity_percent: 55.0,
            wind_speed_ms: 3.0,
            pressure_hpa: 1013.0,
            cloud_cover_percent: 40.0,
        }
    }

    fn series(len: i64) -> Vec<HourlyWeather> {
        (0..len).map(weather_at).collect()
    }

    fn trained_model(pollutant: Pollutant, r2: f64) -> TrainedModel {
        // A constant-output model is enough to exercise the engine paths.
        let rows: Vec<TrainingRow> = (0..20)
            .map(|h| TrainingRow {
                pollutant,
                features: FeatureVector::new(
                    hour(h),
                    10.0 + h as f64,
                    50.0,
                    2.0 + (h % 4) as f64,
                    1010.0,
                    30.0,
                ),
                target: 25.0,
            })
            .collect();
        let mut model = ml::train(pollutant, &rows).unwrap();
        model.metrics = ModelMetrics {
            mse: model.metrics.mse,
            r2,
            n_samples: model.metrics.n_samples,
        };
        model
    }

    fn sample_at(h: i64, value: f64) -> Sample {
        Sample {
            pollutant: Pollutant::Pm25,
            value,
            unit: ConcentrationUnit::MicrogramsPerCubicMeter,
            location: GeoLocation::new(59.3, 18.0),
            timestamp: hour(h),
            quality: QualityFlag::Valid,
            source: SampleSource::GroundStation,
        }
    }

    #[test]
    fn confidence_decays_with_hour_offset() {
        let c0 = confidence_at(0.8, 0);
        let c12 = confidence_at(0.8, 12);
        assert!((c0 - 0.8).abs() < 1e-9);
        assert!((c12 - 0.8 * (-1.0f64).exp()).abs() < 1e-9);
        assert!((c12 - 0.294).abs() < 0.001);
    }

    #[test]
    fn confidence_is_capped() {
        assert_eq!(confidence_at(1.0, 0), CONFIDENCE_CAP);
    }

    #[test]
    fn model_forecast_confidence_is_non_increasing() {
        let model = trained_model(Pollutant::No2, 0.85);
        let points = model_forecast(Pollutant::No2, &model, &series(48));
        for pair in points.windows(2) {
            assert!(pair[1].confidence <= pair[0].confidence);
        }
    }

    #[test]
    fn calm_high_pressure_boosts_combustion_gases() {
        let mut calm = weather_at(0);
        calm.wind_speed_ms = 0.0;
        calm.pressure_hpa = 1013.0;

        let mut windy = weather_at(0);
        windy.wind_speed_ms = 12.0;

        assert!(
            weather_adjustment(Pollutant::No2, &calm)
                > weather_adjustment(Pollutant::No2, &windy)
        );
        // Max boost at zero wind: 1.0 * 1.5.
        assert!((weather_adjustment(Pollutant::No2, &calm) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn humid_calm_air_boosts_particulates() {
        let mut humid = weather_at(0);
        humid.wind_speed_ms = 1.0;
        humid.humidity_percent = 90.0;

        let mut dry_windy = weather_at(0);
        dry_windy.wind_speed_ms = 9.0;
        dry_windy.humidity_percent = 30.0;

        assert!(
            weather_adjustment(Pollutant::Pm25, &humid)
                > weather_adjustment(Pollutant::Pm25, &dry_windy)
        );
    }

    #[test]
    fn heat_boosts_ozone_and_humidity_damps_it() {
        let mut hot_dry = weather_at(0);
        hot_dry.temperature_c = 32.0;
        hot_dry.humidity_percent = 25.0;

        let mut cool_humid = weather_at(0);
        cool_humid.temperature_c = 8.0;
        cool_humid.humidity_percent = 85.0;

        assert!(
            weather_adjustment(Pollutant::O3, &hot_dry)
                > weather_adjustment(Pollutant::O3, &cool_humid)
        );
    }

    #[test]
    fn formaldehyde_adjustment_tracks_temperature_only() {
        let mut warm = weather_at(0);
        warm.temperature_c = 30.0;
        let mut cold = weather_at(0);
        cold.temperature_c = 0.0;

        assert!(
            weather_adjustment(Pollutant::Hcho, &warm)
                > weather_adjustment(Pollutant::Hcho, &cold)
        );
        assert_eq!(weather_adjustment(Pollutant::Hcho, &cold), 1.0);
    }

    proptest! {
        #[test]
        fn adjustment_respects_bounds(
            temperature in -40.0f64..50.0,
            humidity in 0.0f64..100.0,
            wind in 0.0f64..40.0,
            pressure in 930.0f64..1070.0,
        ) {
            let w = HourlyWeather {
                timestamp: hour(0),
                temperature_c: temperature,
                humidity_percent: humidity,
                wind_speed_ms: wind,
                pressure_hpa: pressure,
                cloud_cover_percent: 50.0,
            };
            for pollutant in [Pollutant::Pm25, Pollutant::No2, Pollutant::O3, Pollutant::Hcho] {
                let m = weather_adjustment(pollutant, &w);
                prop_assert!((0.3..=2.0).contains(&m));
            }
        }

        #[test]
        fn forecast_values_are_never_negative(
            temperature in -40.0f64..50.0,
            humidity in 0.0f64..100.0,
            wind in 0.0f64..40.0,
        ) {
            let model = trained_model(Pollutant::Pm25, 0.7);
            let w = HourlyWeather {
                timestamp: hour(0),
                temperature_c: temperature,
                humidity_percent: humidity,
                wind_speed_ms: wind,
                pressure_hpa: 1013.0,
                cloud_cover_percent: 50.0,
            };
            let points = model_forecast(Pollutant::Pm25, &model, &[w]);
            prop_assert!(points[0].value >= 0.0);
        }
    }

    #[test]
    fn fallback_uses_trend_of_recent_history() {
        // Rising series: 10, 12, .., 18 over five hours.
        let history: Vec<Sample> = (0..5).map(|h| sample_at(h, 10.0 + 2.0 * h as f64)).collect();
        let points = fallback_forecast(Pollutant::Pm25, &history, &series(6));

        assert_eq!(points.len(), 6);
        for p in &points {
            assert_eq!(p.confidence, 0.5);
            assert!(p.value >= 0.0);
        }
        // Mean 14, trend (18-10)/5 = 1.6: later hours sit above earlier
        // ones net of the ±20 % diurnal wobble.
        assert!(points[5].value > points[0].value);
    }

    #[test]
    fn fallback_without_history_uses_the_baseline() {
        let points = fallback_forecast(Pollutant::Pm25, &[], &series(3));
        for p in &points {
            assert_eq!(p.value, Pollutant::Pm25.baseline());
            assert_eq!(p.confidence, 0.3);
        }
    }

    #[test]
    fn fallback_ignores_invalid_history() {
        let mut bad = sample_at(0, 1_000.0);
        bad.quality = QualityFlag::Invalid;
        let points = fallback_forecast(Pollutant::Pm25, &[bad], &series(2));
        assert_eq!(points[0].value, Pollutant::Pm25.baseline());
        assert_eq!(points[0].confidence, 0.3);
    }

    #[test]
    fn fallback_clamps_negative_trend_projections_to_zero() {
        // Steeply falling series pushes the projection below zero.
        let history: Vec<Sample> = (0..5).map(|h| sample_at(h, 20.0 - 5.0 * h as f64)).collect();
        let points = fallback_forecast(Pollutant::Pm25, &history, &series(24));
        for p in &points {
            assert!(p.value >= 0.0);
        }
    }

    #[test]
    fn trend_window_only_keeps_the_most_recent_24_points() {
        // 30 old high readings followed by 24 at zero: the window must
        // contain only the zeros.
        let mut history: Vec<Sample> = (0..30).map(|h| sample_at(h, 500.0)).collect();
        history.extend((30..54).map(|h| sample_at(h, 0.0)));

        let points = fallback_forecast(Pollutant::Pm25, &history, &series(1));
        assert_eq!(points[0].value, 0.0);
    }

    #[tokio::test]
    async fn engine_generates_full_bundles_with_seeded_determinism() {
        use crate::repo::memory::{InMemorySampleRepository, InMemoryWeatherRepository};

        let samples = Arc::new(InMemorySampleRepository::default());
        let weather = Arc::new(InMemoryWeatherRepository::default());
        for h in 0..6 {
            samples.insert(sample_at(h, 15.0)).await.unwrap();
        }

        let cfg = ForecastConfig {
            horizon_hours: 12,
            seed: Some(99),
            ..ForecastConfig::default()
        };
        let engine = ForecastEngine::new(samples, weather, cfg);
        let location =
            MonitoredLocation::new("test", GeoLocation::new(59.3, 18.0), 0.5);

        let now = hour(12);
        let a = engine.generate_at(&location, now).await.unwrap();
        let b = engine.generate_at(&location, now).await.unwrap();

        assert_eq!(a.pollutants, b.pollutants);
        assert_eq!(a.index, b.index);
        assert_eq!(a.horizon_hours, 12);
        assert_eq!(a.pollutants[&Pollutant::Pm25].len(), 12);
        // PM2.5 has history (confidence 0.5); the rest fall back to
        // baselines (0.3).
        assert_eq!(a.pollutants[&Pollutant::Pm25][0].confidence, 0.5);
        assert_eq!(a.pollutants[&Pollutant::No2][0].confidence, 0.3);
        assert!(!a.index.is_empty());
    }
}
