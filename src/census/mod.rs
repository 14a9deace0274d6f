//! Census race composition: per (tract, year) shares and year-over-year change.

mod change;
mod race;

pub use change::{RaceChange, CHANGE_DECIMALS};
pub use race::{
    race_counts_from_frame, read_race_table, MetricsError, RaceColumns, RaceCounts, RaceGroup, RacePanel,
    RaceShares, ZeroPopulationPolicy,
};
