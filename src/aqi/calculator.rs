//! Concentration → severity index conversion.

use crate::domain::{ConcentrationUnit, IndexCategory, Pollutant};

use super::breakpoints::{table_for, INDEX_CAP};
use super::units::to_canonical;

/// Compute the severity index for a concentration.
///
/// Returns `None` when the pollutant has no breakpoint table, the unit
/// cannot be normalized for it, or the reading itself is unusable; such
/// results are excluded from dominant-pollutant selection rather than
/// treated as errors.
///
/// Concentrations above the highest band return the fixed cap (500) with
/// no extrapolation. Band interpolation is the standard regulatory
/// formula, rounded to the nearest integer:
///
/// `index = (Ihigh - Ilow) / (Chigh - Clow) * (C - Clow) + Ilow`
pub fn compute_index(
    pollutant: Pollutant,
    concentration: f64,
    unit: ConcentrationUnit,
) -> Option<u16> {
    let table = table_for(pollutant)?;
    let c = to_canonical(pollutant, concentration, unit)?;
    if c < 0.0 {
        return None;
    }

    for band in table.bands {
        if c <= band.conc_high {
            // Values in the truncation gap below a band's published low
            // bound snap to that bound, keeping the mapping total.
            let c = c.max(band.conc_low);
            let span_i = f64::from(band.index_high - band.index_low);
            let span_c = band.conc_high - band.conc_low;
            let index = span_i / span_c * (c - band.conc_low) + f64::from(band.index_low);
            return Some(index.round() as u16);
        }
    }

    Some(INDEX_CAP)
}

/// Category label for an index value (fixed ladder).
pub fn category(index: u16) -> IndexCategory {
    IndexCategory::from_index(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const UG: ConcentrationUnit = ConcentrationUnit::MicrogramsPerCubicMeter;
    const PPB: ConcentrationUnit = ConcentrationUnit::PartsPerBillion;

    #[rstest]
    // Band-edge continuity for PM2.5: 35.4 closes the moderate band at
    // exactly 100, 35.5 opens the next band at exactly 101.
    #[case(Pollutant::Pm25, 35.4, 100)]
    #[case(Pollutant::Pm25, 35.5, 101)]
    #[case(Pollutant::Pm25, 12.0, 50)]
    #[case(Pollutant::Pm25, 12.1, 51)]
    #[case(Pollutant::Pm25, 0.0, 0)]
    #[case(Pollutant::Pm10, 54.0, 50)]
    #[case(Pollutant::Pm10, 55.0, 51)]
    fn band_boundaries_are_exact(
        #[case] pollutant: Pollutant,
        #[case] concentration: f64,
        #[case] expected: u16,
    ) {
        assert_eq!(compute_index(pollutant, concentration, UG), Some(expected));
    }

    #[test]
    fn interpolates_within_band() {
        // Midpoint of the PM2.5 good band (0..12 → 0..50).
        let idx = compute_index(Pollutant::Pm25, 6.0, UG).unwrap();
        assert_eq!(idx, 25);
    }

    #[test]
    fn concentrations_above_top_band_hit_the_cap() {
        assert_eq!(compute_index(Pollutant::Pm25, 700.0, UG), Some(500));
        // O3 has no bands past 200 ppb, so anything above caps too.
        assert_eq!(compute_index(Pollutant::O3, 250.0, PPB), Some(500));
    }

    #[test]
    fn unknown_pollutant_yields_none() {
        assert_eq!(compute_index(Pollutant::Hcho, 10.0, UG), None);
    }

    #[test]
    fn negative_and_unconvertible_readings_yield_none() {
        assert_eq!(compute_index(Pollutant::Pm25, -1.0, UG), None);
        assert_eq!(compute_index(Pollutant::Pm25, 10.0, PPB), None);
    }

    #[test]
    fn unit_normalization_happens_before_lookup() {
        // 188 µg/m³ NO2 ≈ 100 ppb, which closes the moderate band.
        let idx = compute_index(Pollutant::No2, 188.0, UG).unwrap();
        assert_eq!(idx, 100);
    }

    proptest! {
        #[test]
        fn index_is_nondecreasing_in_concentration(
            a in 0.0f64..600.0,
            b in 0.0f64..600.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let idx_lo = compute_index(Pollutant::Pm25, lo, UG).unwrap();
            let idx_hi = compute_index(Pollutant::Pm25, hi, UG).unwrap();
            prop_assert!(idx_lo <= idx_hi);
        }

        #[test]
        fn index_stays_in_range(c in 0.0f64..10_000.0) {
            let idx = compute_index(Pollutant::Pm10, c, UG).unwrap();
            prop_assert!(idx <= 500);
        }
    }
}
