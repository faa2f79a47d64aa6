pub mod aggregate;
pub mod engine;
pub mod weather;

pub use aggregate::aggregate;
pub use engine::{
    confidence_at, weather_adjustment, ForecastConfig, ForecastEngine, ADJUSTMENT_BOUNDS,
    CONFIDENCE_CAP,
};
pub use weather::{diurnal, synthesize_series, HourlyWeather};
