use ahash::AHashMap;
use polars::prelude::*;
use tracing::warn;

use super::{CoverageColumn, TractSet};
use crate::types::{HolcGrade, TractId, UNASSIGNED_LABEL};

/// Residual share of a tract outside every real grade: `1 - sum(fractions)`.
/// Negative when same-grade overlaps were double counted; surfaced, not clamped.
#[inline]
pub fn residual(fractions: &[f64]) -> f64 {
    1.0 - fractions.iter().sum::<f64>()
}

/// Grade coverage of one tract across A-D, plus the unassigned residual.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRow {
    pub tract: TractId,
    pub fractions: [f64; 4],
    pub unassigned: f64,
}

impl CoverageRow {
    pub fn new(tract: TractId, fractions: [f64; 4]) -> Self {
        Self { unassigned: residual(&fractions), tract, fractions }
    }

    #[inline]
    pub fn fraction(&self, grade: HolcGrade) -> f64 {
        self.fractions[grade.index()]
    }

    /// True if any part of the tract was historically graded.
    #[inline]
    pub fn is_redlined(&self) -> bool {
        self.unassigned < 1.0
    }

    /// The grade covering the largest share of a graded tract.
    /// Ties go to the better (earlier) grade.
    pub fn predominant_grade(&self) -> Option<HolcGrade> {
        if !self.is_redlined() {
            return None;
        }
        HolcGrade::ALL.iter().copied()
            .fold(None, |best: Option<HolcGrade>, grade| match best {
                Some(b) if self.fraction(b) >= self.fraction(grade) => Some(b),
                _ => Some(grade),
            })
    }
}

/// One coverage row per tract, in tract order.
#[derive(Debug, Clone, Default)]
pub struct CoverageTable {
    rows: Vec<CoverageRow>,
    index: AHashMap<TractId, usize>,
}

impl CoverageTable {
    /// Join per-grade columns on tract id. A grade with no column, or a column
    /// without the tract, counts as zero coverage.
    pub fn assemble(tracts: &TractSet, columns: &[CoverageColumn]) -> Self {
        let rows = tracts.ids().iter()
            .map(|id| {
                let mut fractions = [0.0; 4];
                for column in columns {
                    fractions[column.grade.index()] += column.get(id).unwrap_or(0.0);
                }
                let row = CoverageRow::new(id.clone(), fractions);
                if row.unassigned < 0.0 {
                    warn!(tract = %id, unassigned = row.unassigned, "grade coverage exceeds tract area");
                }
                row
            })
            .collect::<Vec<_>>();

        let index = rows.iter().enumerate().map(|(i, row)| (row.tract.clone(), i)).collect();
        Self { rows, index }
    }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    #[inline] pub fn rows(&self) -> &[CoverageRow] { &self.rows }

    pub fn get(&self, tract: &TractId) -> Option<&CoverageRow> {
        self.index.get(tract).map(|&i| &self.rows[i])
    }

    /// Rows for tracts with any historical grade coverage.
    pub fn redlined(&self) -> impl Iterator<Item = &CoverageRow> {
        self.rows.iter().filter(|row| row.is_redlined())
    }

    /// Columns: `id`, `A`..`D`, `U`.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![Column::new(
            "id".into(),
            self.rows.iter().map(|row| row.tract.to_string()).collect::<Vec<_>>(),
        )];
        for grade in HolcGrade::ALL {
            columns.push(Column::new(
                grade.label().into(),
                self.rows.iter().map(|row| row.fraction(grade)).collect::<Vec<_>>(),
            ));
        }
        columns.push(Column::new(
            UNASSIGNED_LABEL.into(),
            self.rows.iter().map(|row| row.unassigned).collect::<Vec<_>>(),
        ));
        DataFrame::new(columns)
    }
}
