//! Curated deed-restriction records keyed by census tract.
//!
//! The table is hand-built from press maps of neighborhoods whose deeds carry
//! (or carried) race-exclusionary language. Each row names a tract number, the
//! neighborhood, whether the language is still present, and how much of the
//! tract the neighborhood covers. Tracts absent from the table, and blank
//! cells, are reported as `unknown` rather than left empty.

use std::{collections::BTreeMap, fmt, path::Path};

use anyhow::{Context, Result};
use polars::frame::DataFrame;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    io::csv::{non_blank, read_csv_text, text_column},
    types::TractId,
};

/// Label used for every categorical field with no known value.
pub const UNKNOWN: &str = "unknown";

/// Whether a neighborhood's deeds contain race-exclusionary language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RestrictionStatus {
    /// Language is still present.
    Current,
    /// Language was present and has recently been removed.
    Recent,
    /// The deeds never carried such language.
    Never,
    Unknown,
}

impl RestrictionStatus {
    pub const ALL: [RestrictionStatus; 4] = [
        RestrictionStatus::Current,
        RestrictionStatus::Recent,
        RestrictionStatus::Never,
        RestrictionStatus::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RestrictionStatus::Current => "current",
            RestrictionStatus::Recent => "recent",
            RestrictionStatus::Never => "never",
            RestrictionStatus::Unknown => UNKNOWN,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label().eq_ignore_ascii_case(text))
    }
}

/// How much of the tract the restricted neighborhood covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CoverageDegree {
    Half,
    Most,
    /// Recorded as "some" in the source table.
    Partial,
    Unknown,
}

impl CoverageDegree {
    pub const ALL: [CoverageDegree; 4] = [
        CoverageDegree::Half,
        CoverageDegree::Most,
        CoverageDegree::Partial,
        CoverageDegree::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CoverageDegree::Half => "half",
            CoverageDegree::Most => "most",
            CoverageDegree::Partial => "some",
            CoverageDegree::Unknown => UNKNOWN,
        }
    }

    fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.label().eq_ignore_ascii_case(text))
    }
}

impl fmt::Display for RestrictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for CoverageDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeedError {
    #[error("row {row}: missing tract number")]
    MissingTract { row: usize },
    #[error("row {row}: unrecognized {field} value {value:?}")]
    UnknownCategory { row: usize, field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeedRecord {
    pub tract: TractId,
    pub neighborhood: String,
    pub restriction: RestrictionStatus,
    pub degree: CoverageDegree,
}

impl DeedRecord {
    /// Placeholder for a tract with no curated record.
    pub fn unknown(tract: TractId) -> Self {
        Self {
            tract,
            neighborhood: UNKNOWN.to_string(),
            restriction: RestrictionStatus::Unknown,
            degree: CoverageDegree::Unknown,
        }
    }
}

/// Header names in the deed-restriction table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeedColumns {
    pub tract: String,
    pub neighborhood: String,
    pub restriction: String,
    pub degree: String,
}

impl Default for DeedColumns {
    fn default() -> Self {
        Self {
            tract: "tract_2010".into(),
            neighborhood: "Neighborhood".into(),
            restriction: "restriction".into(),
            degree: "degree".into(),
        }
    }
}

/// Parse deed rows, rebuilding each tract id as `prefix + tract number`.
pub fn deeds_from_frame(df: &DataFrame, columns: &DeedColumns, prefix: &str) -> Result<Vec<DeedRecord>> {
    let tracts = text_column(df, &columns.tract)?;
    let names = text_column(df, &columns.neighborhood)?;
    let restrictions = text_column(df, &columns.restriction)?;
    let degrees = text_column(df, &columns.degree)?;

    (0..df.height())
        .map(|row| -> Result<DeedRecord> {
            let fragment = non_blank(tracts[row]).ok_or(DeedError::MissingTract { row })?;

            let restriction = match non_blank(restrictions[row]) {
                None => RestrictionStatus::Unknown,
                Some(text) => RestrictionStatus::parse(text).ok_or_else(|| DeedError::UnknownCategory {
                    row, field: "restriction", value: text.to_string(),
                })?,
            };
            let degree = match non_blank(degrees[row]) {
                None => CoverageDegree::Unknown,
                Some(text) => CoverageDegree::parse(text).ok_or_else(|| DeedError::UnknownCategory {
                    row, field: "degree", value: text.to_string(),
                })?,
            };

            Ok(DeedRecord {
                tract: TractId::from_fragment(prefix, fragment),
                neighborhood: non_blank(names[row]).unwrap_or(UNKNOWN).to_string(),
                restriction,
                degree,
            })
        })
        .collect()
}

/// Reads the curated deed-restriction CSV.
pub fn read_deed_table(path: &Path, columns: &DeedColumns, prefix: &str) -> Result<Vec<DeedRecord>> {
    let df = read_csv_text(path, 0)?;
    let deeds = deeds_from_frame(&df, columns, prefix)
        .with_context(|| format!("[deeds] Failed to parse deed table {}", path.display()))?;
    info!(path = %path.display(), records = deeds.len(), "loaded deed restrictions");
    Ok(deeds)
}

/// Deed records grouped by tract, in table order within each tract.
#[derive(Debug, Clone, Default)]
pub struct DeedIndex {
    by_tract: BTreeMap<TractId, Vec<DeedRecord>>,
}

impl DeedIndex {
    pub fn new(records: impl IntoIterator<Item = DeedRecord>) -> Self {
        let mut by_tract: BTreeMap<TractId, Vec<DeedRecord>> = BTreeMap::new();
        for record in records {
            by_tract.entry(record.tract.clone()).or_default().push(record);
        }
        Self { by_tract }
    }

    /// Records for `tract`, or a single all-unknown record when there are none.
    /// A tract shared by several neighborhoods yields one record per neighborhood.
    pub fn lookup(&self, tract: &TractId) -> Vec<DeedRecord> {
        match self.by_tract.get(tract) {
            Some(records) => records.clone(),
            None => vec![DeedRecord::unknown(tract.clone())],
        }
    }

    pub fn len(&self) -> usize {
        self.by_tract.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tract.is_empty()
    }
}
