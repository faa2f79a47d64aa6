//! Concentration unit normalization.
//!
//! Gas conversions assume 25 °C and 1 atm (24.45 L/mol molar volume), the
//! convention the breakpoint tables are published under.

use crate::domain::{ConcentrationUnit, Pollutant};

const MOLAR_VOLUME_L: f64 = 24.45;

/// Molecular weight in g/mol, `None` for particulates (mass-only species).
fn molecular_weight(pollutant: Pollutant) -> Option<f64> {
    match pollutant {
        Pollutant::Pm25 | Pollutant::Pm10 => None,
        Pollutant::No2 => Some(46.01),
        Pollutant::So2 => Some(64.07),
        Pollutant::O3 => Some(48.00),
        Pollutant::Co => Some(28.01),
        Pollutant::Hcho => Some(30.03),
    }
}

/// Convert a concentration into the pollutant's canonical unit.
///
/// Returns `None` for combinations with no physical meaning (volume ratios
/// for particulates) so the caller can drop the sample instead of feeding a
/// nonsense value into the index tables.
pub fn to_canonical(pollutant: Pollutant, value: f64, from: ConcentrationUnit) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }

    let target = pollutant.canonical_unit();
    if from == target {
        return Some(value);
    }

    match target {
        ConcentrationUnit::MicrogramsPerCubicMeter => {
            let ug = match from {
                ConcentrationUnit::MicrogramsPerCubicMeter => value,
                ConcentrationUnit::MilligramsPerCubicMeter => value * 1000.0,
                ConcentrationUnit::PartsPerBillion => {
                    value * molecular_weight(pollutant)? / MOLAR_VOLUME_L
                }
                ConcentrationUnit::PartsPerMillion => {
                    value * 1000.0 * molecular_weight(pollutant)? / MOLAR_VOLUME_L
                }
            };
            Some(ug)
        }
        ConcentrationUnit::PartsPerBillion => {
            let mw = molecular_weight(pollutant)?;
            let ppb = match from {
                ConcentrationUnit::PartsPerBillion => value,
                ConcentrationUnit::PartsPerMillion => value * 1000.0,
                ConcentrationUnit::MicrogramsPerCubicMeter => value * MOLAR_VOLUME_L / mw,
                ConcentrationUnit::MilligramsPerCubicMeter => {
                    value * 1000.0 * MOLAR_VOLUME_L / mw
                }
            };
            Some(ppb)
        }
        ConcentrationUnit::PartsPerMillion => {
            let mw = molecular_weight(pollutant)?;
            let ppm = match from {
                ConcentrationUnit::PartsPerMillion => value,
                ConcentrationUnit::PartsPerBillion => value / 1000.0,
                ConcentrationUnit::MilligramsPerCubicMeter => value * MOLAR_VOLUME_L / mw,
                ConcentrationUnit::MicrogramsPerCubicMeter => {
                    value / 1000.0 * MOLAR_VOLUME_L / mw
                }
            };
            Some(ppm)
        }
        // No pollutant uses mg/m³ as its canonical unit.
        ConcentrationUnit::MilligramsPerCubicMeter => None,
    }
}
