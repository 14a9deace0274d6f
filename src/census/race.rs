use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::RaceChange;
use crate::{
    io::csv::{non_blank, read_csv_text, text_column},
    types::TractId,
};

/// Race groups reported per tract. `Other` is the residual of the three
/// counted groups (single-race Asian, Native American, Pacific Islander, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RaceGroup {
    White,
    Black,
    Mixed,
    Other,
}

impl RaceGroup {
    pub const ALL: [RaceGroup; 4] = [RaceGroup::White, RaceGroup::Black, RaceGroup::Mixed, RaceGroup::Other];

    pub fn label(self) -> &'static str {
        match self {
            RaceGroup::White => "white",
            RaceGroup::Black => "black",
            RaceGroup::Mixed => "mixed",
            RaceGroup::Other => "other",
        }
    }
}

impl fmt::Display for RaceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Header labels selected from a census race table (ACS B02001).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceColumns {
    pub id: String,
    pub total: String,
    pub white_alone: String,
    pub black_alone: String,
    pub two_or_more: String,
}

impl Default for RaceColumns {
    fn default() -> Self {
        Self {
            id: "id".into(),
            total: "Estimate!!Total".into(),
            white_alone: "Estimate!!Total!!White alone".into(),
            black_alone: "Estimate!!Total!!Black or African American alone".into(),
            two_or_more: "Estimate!!Total!!Two or more races".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    #[error("tract {tract} has no population in {year}; percentages are undefined")]
    ZeroPopulation { tract: TractId, year: u16 },
    #[error("tract {tract} appears more than once in the {year} race table")]
    DuplicateRecord { tract: TractId, year: u16 },
    #[error("no race table loaded for year {0}")]
    MissingYear(u16),
    #[error("baseline year {baseline} must precede comparison year {comparison}")]
    YearOrder { baseline: u16, comparison: u16 },
}

/// What to do with a (tract, year) whose total population is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroPopulationPolicy {
    /// Abort the run with [`MetricsError::ZeroPopulation`].
    #[default]
    Fail,
    /// Drop the record; the tract keeps null percentages for that year.
    Omit,
}

/// Population counts for one tract in one census year.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceCounts {
    pub tract: TractId,
    pub year: u16,
    pub total: f64,
    pub white: f64,
    pub black: f64,
    pub mixed: f64,
}

impl RaceCounts {
    /// Convert counts to shares of the tract total.
    pub fn shares(&self) -> Result<RaceShares, MetricsError> {
        if !(self.total > 0.0) {
            return Err(MetricsError::ZeroPopulation { tract: self.tract.clone(), year: self.year });
        }
        let white = self.white / self.total;
        let black = self.black / self.total;
        let mixed = self.mixed / self.total;
        Ok(RaceShares {
            tract: self.tract.clone(),
            year: self.year,
            white,
            black,
            mixed,
            other: 1.0 - (white + black + mixed),
        })
    }
}

/// Share of a tract's population in each race group for one year.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceShares {
    pub tract: TractId,
    pub year: u16,
    pub white: f64,
    pub black: f64,
    pub mixed: f64,
    pub other: f64,
}

impl RaceShares {
    #[inline]
    pub fn share(&self, group: RaceGroup) -> f64 {
        match group {
            RaceGroup::White => self.white,
            RaceGroup::Black => self.black,
            RaceGroup::Mixed => self.mixed,
            RaceGroup::Other => self.other,
        }
    }
}

/// Parse one race table into counts. Every cell is read as text; counts must be
/// plain numbers and rows without a tract id are an error.
pub fn race_counts_from_frame(df: &DataFrame, year: u16, columns: &RaceColumns) -> Result<Vec<RaceCounts>> {
    let ids = text_column(df, &columns.id)?;
    let totals = text_column(df, &columns.total)?;
    let whites = text_column(df, &columns.white_alone)?;
    let blacks = text_column(df, &columns.black_alone)?;
    let mixeds = text_column(df, &columns.two_or_more)?;

    /// Parse a count cell, naming the row and column on failure.
    fn count(cell: Option<&str>, row: usize, column: &str) -> Result<f64> {
        let text = non_blank(cell)
            .ok_or_else(|| anyhow!("[census] Row {row}: missing value in column {column:?}"))?;
        let value = text.parse::<f64>()
            .with_context(|| format!("[census] Row {row}: {text:?} in column {column:?} is not a number"))?;
        anyhow::ensure!(value.is_finite() && value >= 0.0, "[census] Row {row}: invalid count {value} in column {column:?}");
        Ok(value)
    }

    (0..df.height())
        .map(|row| -> Result<RaceCounts> {
            let id = non_blank(ids[row])
                .ok_or_else(|| anyhow!("[census] Row {row}: missing tract id in column {:?}", columns.id))?;
            Ok(RaceCounts {
                tract: TractId::new(id),
                year,
                total: count(totals[row], row, &columns.total)?,
                white: count(whites[row], row, &columns.white_alone)?,
                black: count(blacks[row], row, &columns.black_alone)?,
                mixed: count(mixeds[row], row, &columns.two_or_more)?,
            })
        })
        .collect()
}

/// Reads one census race table. `skip_rows` drops leading lines before the
/// header (ACS downloads carry a variable-code row above the label row).
pub fn read_race_table(path: &Path, year: u16, columns: &RaceColumns, skip_rows: usize) -> Result<Vec<RaceCounts>> {
    let df = read_csv_text(path, skip_rows)?;
    let counts = race_counts_from_frame(&df, year, columns)
        .with_context(|| format!("[census] Failed to parse race table {}", path.display()))?;
    info!(path = %path.display(), year, tracts = counts.len(), "loaded race table");
    Ok(counts)
}

/// Race shares normalized to one record per (tract, year).
#[derive(Debug, Clone, Default)]
pub struct RacePanel {
    shares: BTreeMap<(TractId, u16), RaceShares>,
    years: BTreeSet<u16>,
}

impl RacePanel {
    pub fn from_counts(
        counts: impl IntoIterator<Item = RaceCounts>,
        policy: ZeroPopulationPolicy,
    ) -> Result<Self, MetricsError> {
        let mut panel = Self::default();
        for record in counts {
            let key = (record.tract.clone(), record.year);
            if panel.shares.contains_key(&key) {
                return Err(MetricsError::DuplicateRecord { tract: record.tract, year: record.year });
            }
            panel.years.insert(record.year);

            let shares = match (record.shares(), policy) {
                (Ok(shares), _) => shares,
                (Err(MetricsError::ZeroPopulation { tract, year }), ZeroPopulationPolicy::Omit) => {
                    debug!(tract = %tract, year, "omitting zero-population tract");
                    continue;
                }
                (Err(err), _) => return Err(err),
            };
            panel.shares.insert(key, shares);
        }
        Ok(panel)
    }

    /// Census years with at least one loaded record.
    pub fn years(&self) -> impl Iterator<Item = u16> + '_ {
        self.years.iter().copied()
    }

    pub fn has_year(&self, year: u16) -> bool {
        self.years.contains(&year)
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn get(&self, tract: &TractId, year: u16) -> Option<&RaceShares> {
        self.shares.get(&(tract.clone(), year))
    }

    /// Percentage-point change for `tract` from `from` to `to`; `None` if either year is missing.
    pub fn change(&self, tract: &TractId, from: u16, to: u16) -> Option<RaceChange> {
        Some(RaceChange::between(self.get(tract, from)?, self.get(tract, to)?))
    }
}
