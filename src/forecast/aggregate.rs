//! Per-hour dominant-pollutant index rollup over forecast output.

use std::collections::BTreeMap;

use strum::IntoEnumIterator;

use crate::aqi;
use crate::domain::{ForecastPoint, IndexPoint, Pollutant};

/// Roll per-pollutant forecasts up into one [`IndexPoint`] per hour.
///
/// Pollutants without a breakpoint table contribute nothing and can never
/// be dominant. Ties go to the earlier pollutant in the fixed iteration
/// order, which keeps the result deterministic across runs.
pub fn aggregate(
    per_pollutant: &BTreeMap<Pollutant, Vec<ForecastPoint>>,
    horizon_hours: usize,
) -> Vec<IndexPoint> {
    let mut out = Vec::with_capacity(horizon_hours);

    for h in 0..horizon_hours {
        let mut breakdown = BTreeMap::new();
        let mut timestamp = None;
        let mut best: Option<(Pollutant, u16)> = None;

        for pollutant in Pollutant::iter() {
            let Some(point) = per_pollutant.get(&pollutant).and_then(|pts| pts.get(h)) else {
                continue;
            };
            timestamp.get_or_insert(point.timestamp);

            let Some(index) =
                aqi::compute_index(pollutant, point.value, pollutant.canonical_unit())
            else {
                continue;
            };
            breakdown.insert(pollutant, index);

            // Strict comparison keeps the first pollutant on ties.
            if best.map_or(true, |(_, current)| index > current) {
                best = Some((pollutant, index));
            }
        }

        if let (Some(timestamp), Some((dominant, value))) = (timestamp, best) {
            out.push(IndexPoint {
                timestamp,
                value,
                category: aqi::category(value),
                dominant,
                breakdown,
            });
        }
    }

    out
}
