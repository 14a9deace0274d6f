use super::{RaceGroup, RaceShares};
use crate::{common::round_to, types::TractId};

/// Decimal places kept on percentage-point changes.
pub const CHANGE_DECIMALS: i32 = 2;

/// Change in each group's share of a tract between two census years,
/// `round(later - earlier, 2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceChange {
    pub tract: TractId,
    pub from_year: u16,
    pub to_year: u16,
    pub white: f64,
    pub black: f64,
    pub mixed: f64,
    pub other: f64,
}

impl RaceChange {
    pub fn between(earlier: &RaceShares, later: &RaceShares) -> Self {
        let delta = |group: RaceGroup| round_to(later.share(group) - earlier.share(group), CHANGE_DECIMALS);
        Self {
            tract: later.tract.clone(),
            from_year: earlier.year,
            to_year: later.year,
            white: delta(RaceGroup::White),
            black: delta(RaceGroup::Black),
            mixed: delta(RaceGroup::Mixed),
            other: delta(RaceGroup::Other),
        }
    }

    #[inline]
    pub fn get(&self, group: RaceGroup) -> f64 {
        match group {
            RaceGroup::White => self.white,
            RaceGroup::Black => self.black,
            RaceGroup::Mixed => self.mixed,
            RaceGroup::Other => self.other,
        }
    }
}
