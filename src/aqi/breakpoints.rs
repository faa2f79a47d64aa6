//! Pollutant breakpoint tables.
//!
//! The tables are a fixed configuration artifact: changing a band changes
//! index semantics for every consumer, so revisions bump [`TABLE_VERSION`].

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::domain::{ConcentrationUnit, Pollutant};

/// Revision identifier for the band set below.
pub const TABLE_VERSION: &str = "epa-aqi-2012.1";

/// Index returned when a concentration exceeds the highest band.
pub const INDEX_CAP: u16 = 500;

/// One interpolation band: concentrations in [low, high] map linearly onto
/// indices [index_low, index_high].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub conc_low: f64,
    pub conc_high: f64,
    pub index_low: u16,
    pub index_high: u16,
}

const fn band(conc_low: f64, conc_high: f64, index_low: u16, index_high: u16) -> Band {
    Band {
        conc_low,
        conc_high,
        index_low,
        index_high,
    }
}

/// Ordered band list for one pollutant, in that pollutant's table unit.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointTable {
    pub unit: ConcentrationUnit,
    pub bands: &'static [Band],
}

const PM25_BANDS: &[Band] = &[
    band(0.0, 12.0, 0, 50),
    band(12.1, 35.4, 51, 100),
    band(35.5, 55.4, 101, 150),
    band(55.5, 150.4, 151, 200),
    band(150.5, 250.4, 201, 300),
    band(250.5, 500.4, 301, 500),
];

const PM10_BANDS: &[Band] = &[
    band(0.0, 54.0, 0, 50),
    band(55.0, 154.0, 51, 100),
    band(155.0, 254.0, 101, 150),
    band(255.0, 354.0, 151, 200),
    band(355.0, 424.0, 201, 300),
    band(425.0, 604.0, 301, 500),
];

const NO2_BANDS: &[Band] = &[
    band(0.0, 53.0, 0, 50),
    band(54.0, 100.0, 51, 100),
    band(101.0, 360.0, 101, 150),
    band(361.0, 649.0, 151, 200),
    band(650.0, 1249.0, 201, 300),
    band(1250.0, 2049.0, 301, 500),
];

const SO2_BANDS: &[Band] = &[
    band(0.0, 35.0, 0, 50),
    band(36.0, 75.0, 51, 100),
    band(76.0, 185.0, 101, 150),
    band(186.0, 304.0, 151, 200),
    band(305.0, 604.0, 201, 300),
    band(605.0, 1004.0, 301, 500),
];

// 8-hour ozone bands only; concentrations past the last band hit the cap.
const O3_BANDS: &[Band] = &[
    band(0.0, 54.0, 0, 50),
    band(55.0, 70.0, 51, 100),
    band(71.0, 85.0, 101, 150),
    band(86.0, 105.0, 151, 200),
    band(106.0, 200.0, 201, 300),
];

const CO_BANDS: &[Band] = &[
    band(0.0, 4.4, 0, 50),
    band(4.5, 9.4, 51, 100),
    band(9.5, 12.4, 101, 150),
    band(12.5, 15.4, 151, 200),
    band(15.5, 30.4, 201, 300),
    band(30.5, 50.4, 301, 500),
];

// HCHO intentionally has no table: there is no regulatory index scale for
// it, so it is forecast but never drives the rolled-up index.
static TABLES: Lazy<BTreeMap<Pollutant, BreakpointTable>> = Lazy::new(|| {
    BTreeMap::from([
        (
            Pollutant::Pm25,
            BreakpointTable {
                unit: ConcentrationUnit::MicrogramsPerCubicMeter,
                bands: PM25_BANDS,
            },
        ),
        (
            Pollutant::Pm10,
            BreakpointTable {
                unit: ConcentrationUnit::MicrogramsPerCubicMeter,
                bands: PM10_BANDS,
            },
        ),
        (
            Pollutant::No2,
            BreakpointTable {
                unit: ConcentrationUnit::PartsPerBillion,
                bands: NO2_BANDS,
            },
        ),
        (
            Pollutant::So2,
            BreakpointTable {
                unit: ConcentrationUnit::PartsPerBillion,
                bands: SO2_BANDS,
            },
        ),
        (
            Pollutant::O3,
            BreakpointTable {
                unit: ConcentrationUnit::PartsPerBillion,
                bands: O3_BANDS,
            },
        ),
        (
            Pollutant::Co,
            BreakpointTable {
                unit: ConcentrationUnit::PartsPerMillion,
                bands: CO_BANDS,
            },
        ),
    ])
});

/// Band table for a pollutant, or `None` for pollutants with no index scale.
pub fn table_for(pollutant: Pollutant) -> Option<&'static BreakpointTable> {
    TABLES.get(&pollutant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn hcho_has_no_table() {
        assert!(table_for(Pollutant::Hcho).is_none());
    }

    #[test]
    fn tables_match_canonical_units() {
        for p in Pollutant::iter() {
            if let Some(table) = table_for(p) {
                assert_eq!(table.unit, p.canonical_unit(), "{p}");
            }
        }
    }

    #[test]
    fn bands_are_ordered_and_index_continuous() {
        for p in Pollutant::iter() {
            let Some(table) = table_for(p) else { continue };
            for pair in table.bands.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                assert!(a.conc_high < b.conc_low, "{p}: overlapping bands");
                assert_eq!(
                    a.index_high + 1,
                    b.index_low,
                    "{p}: index ladder must be contiguous"
                );
            }
            for band in table.bands {
                assert!(band.conc_low < band.conc_high);
                assert!(band.index_low < band.index_high);
            }
        }
    }
}
