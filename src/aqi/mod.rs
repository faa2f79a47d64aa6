pub mod breakpoints;
pub mod calculator;
pub mod units;

pub use breakpoints::{table_for, Band, BreakpointTable, INDEX_CAP, TABLE_VERSION};
pub use calculator::{category, compute_index};
pub use units::to_canonical;
