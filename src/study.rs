//! The study pipeline: tract geometry, grade coverage, race composition and
//! deed restrictions joined into one row per tract.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use anyhow::{Context, Result};
use geo::MultiPolygon;
use polars::prelude::*;
use tracing::{debug, info};

use crate::{
    census::{read_race_table, MetricsError, RaceChange, RaceCounts, RaceGroup, RacePanel, RaceShares, ZeroPopulationPolicy},
    config::StudyConfig,
    deeds::{read_deed_table, DeedIndex, DeedRecord, RestrictionStatus},
    geom::{apportion_all, CoverageRow, GradedRegion, OverlayMode, TractSet},
    io::{read_graded_regions, read_tracts, write_csv},
    types::{HolcGrade, TractId, UNASSIGNED_LABEL},
};

/// Everything a study run consumes, already parsed.
#[derive(Debug, Clone, Default)]
pub struct StudyInputs {
    pub tracts: Vec<(TractId, MultiPolygon<f64>)>,
    pub regions: Vec<GradedRegion>,
    pub race: Vec<RaceCounts>,
    pub deeds: Vec<DeedRecord>,
}

impl StudyInputs {
    /// Load every input named by `config` from disk.
    pub fn load(config: &StudyConfig) -> Result<Self> {
        let tracts = read_tracts(&config.tracts_shapefile, &config.tract_id_field)?;
        let regions = read_graded_regions(&config.grades_shapefile, &config.grade_field)?;

        let mut race = Vec::new();
        for table in &config.race_tables {
            race.extend(read_race_table(&table.path, table.year, &config.race_columns, config.race_header_skip)?);
        }

        let deeds = match &config.deeds_csv {
            Some(path) => read_deed_table(path, &config.deed_columns, &config.county_prefix)?,
            None => Vec::new(),
        };

        Ok(Self { tracts, regions, race, deeds })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyOptions {
    pub baseline_year: u16,
    pub comparison_year: u16,
    pub overlay: OverlayMode,
    pub zero_population: ZeroPopulationPolicy,
}

impl StudyOptions {
    pub fn new(baseline_year: u16, comparison_year: u16) -> Self {
        Self {
            baseline_year,
            comparison_year,
            overlay: OverlayMode::default(),
            zero_population: ZeroPopulationPolicy::default(),
        }
    }
}

impl From<&StudyConfig> for StudyOptions {
    fn from(config: &StudyConfig) -> Self {
        Self {
            baseline_year: config.baseline(),
            comparison_year: config.comparison(),
            overlay: config.overlay_mode,
            zero_population: config.zero_population,
        }
    }
}

/// One joined output row. A tract shared by several deed-restricted
/// neighborhoods appears once per neighborhood.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyRow {
    pub tract: TractId,
    /// Race shares by census year; missing years are absent.
    pub shares: BTreeMap<u16, RaceShares>,
    pub change: Option<RaceChange>,
    pub coverage: CoverageRow,
    pub deed: DeedRecord,
}

impl StudyRow {
    #[inline]
    pub fn share(&self, year: u16, group: RaceGroup) -> Option<f64> {
        self.shares.get(&year).map(|s| s.share(group))
    }

    #[inline]
    pub fn top_grade(&self) -> Option<HolcGrade> {
        self.coverage.predominant_grade()
    }
}

/// Mean race change over the rows of one group; `None` where no row has a change.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSummary {
    pub rows: usize,
    pub means: [Option<f64>; 4],
}

impl ChangeSummary {
    #[inline]
    pub fn mean(&self, group: RaceGroup) -> Option<f64> {
        self.means[group as usize]
    }
}

#[derive(Debug, Clone)]
pub struct Study {
    pub options: StudyOptions,
    /// Census years present in the race panel, ascending.
    pub years: Vec<u16>,
    pub rows: Vec<StudyRow>,
}

impl Study {
    /// Join all inputs.
    ///
    /// The working set is the tract geometries whose id appears in the baseline
    /// race table; tracts elsewhere (other counties) are dropped. Race shares
    /// and deed records are then left-joined, so a tract missing from a later
    /// table keeps null shares instead of disappearing.
    pub fn run(inputs: StudyInputs, options: &StudyOptions) -> Result<Self> {
        let StudyInputs { tracts, regions, race, deeds } = inputs;
        if options.baseline_year >= options.comparison_year {
            return Err(MetricsError::YearOrder {
                baseline: options.baseline_year,
                comparison: options.comparison_year,
            }.into());
        }

        let baseline_ids = race.iter()
            .filter(|r| r.year == options.baseline_year)
            .map(|r| r.tract.clone())
            .collect::<BTreeSet<_>>();
        let panel = RacePanel::from_counts(race, options.zero_population)?;
        for year in [options.baseline_year, options.comparison_year] {
            if !panel.has_year(year) {
                return Err(MetricsError::MissingYear(year).into());
            }
        }

        let all_tracts = TractSet::new(tracts)?;
        let loaded = all_tracts.len();
        let tracts = all_tracts.filter(|id| baseline_ids.contains(id));
        debug!(excluded = loaded - tracts.len(), "dropped tracts outside the baseline race table");
        let missing_geometry = baseline_ids.iter().filter(|id| !tracts.contains(id)).count();
        if missing_geometry > 0 {
            debug!(missing_geometry, "baseline tracts without geometry");
        }

        let coverage = apportion_all(&tracts, &regions, options.overlay)?;
        let deeds = DeedIndex::new(deeds);
        let years = panel.years().collect::<Vec<_>>();

        let mut rows = Vec::with_capacity(tracts.len());
        for coverage_row in coverage.rows() {
            let tract = &coverage_row.tract;
            let shares = years.iter()
                .filter_map(|&year| panel.get(tract, year).map(|s| (year, s.clone())))
                .collect::<BTreeMap<_, _>>();
            let change = panel.change(tract, options.baseline_year, options.comparison_year);

            for deed in deeds.lookup(tract) {
                rows.push(StudyRow {
                    tract: tract.clone(),
                    shares: shares.clone(),
                    change: change.clone(),
                    coverage: coverage_row.clone(),
                    deed,
                });
            }
        }

        info!(
            tracts = tracts.len(),
            rows = rows.len(),
            redlined = coverage.redlined().count(),
            "joined study table"
        );

        Ok(Self { options: *options, years, rows })
    }

    /// Load inputs named by `config` and run the study.
    pub fn from_config(config: &StudyConfig) -> Result<Self> {
        let inputs = StudyInputs::load(config)?;
        Self::run(inputs, &StudyOptions::from(config))
    }

    /// Rows for tracts with any historical grade coverage.
    pub fn redlined(&self) -> impl Iterator<Item = &StudyRow> {
        self.rows.iter().filter(|row| row.coverage.is_redlined())
    }

    /// Mean race change per deed restriction status, skipping rows without a change.
    pub fn mean_change_by_restriction(&self) -> BTreeMap<RestrictionStatus, ChangeSummary> {
        let mut groups: BTreeMap<RestrictionStatus, Vec<&StudyRow>> = BTreeMap::new();
        for row in &self.rows {
            groups.entry(row.deed.restriction).or_default().push(row);
        }

        groups.into_iter()
            .map(|(status, rows)| {
                let changes = rows.iter().filter_map(|row| row.change.as_ref()).collect::<Vec<_>>();
                let means = RaceGroup::ALL.map(|group| {
                    (!changes.is_empty())
                        .then(|| changes.iter().map(|c| c.get(group)).sum::<f64>() / changes.len() as f64)
                });
                (status, ChangeSummary { rows: rows.len(), means })
            })
            .collect()
    }

    /// Wide table for presentation: `id`, `percent_<group>_<year>`,
    /// `<group>_change`, `A`..`D`, `U`, `top_grade`, `neighborhood`,
    /// `restriction`, `degree`.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = vec![Column::new(
            "id".into(),
            self.rows.iter().map(|row| row.tract.to_string()).collect::<Vec<_>>(),
        )];

        for &year in &self.years {
            for group in RaceGroup::ALL {
                columns.push(Column::new(
                    format!("percent_{group}_{year}").into(),
                    self.rows.iter().map(|row| row.share(year, group)).collect::<Vec<_>>(),
                ));
            }
        }
        for group in RaceGroup::ALL {
            columns.push(Column::new(
                format!("{group}_change").into(),
                self.rows.iter().map(|row| row.change.as_ref().map(|c| c.get(group))).collect::<Vec<_>>(),
            ));
        }
        for grade in HolcGrade::ALL {
            columns.push(Column::new(
                grade.label().into(),
                self.rows.iter().map(|row| row.coverage.fraction(grade)).collect::<Vec<_>>(),
            ));
        }
        columns.push(Column::new(
            UNASSIGNED_LABEL.into(),
            self.rows.iter().map(|row| row.coverage.unassigned).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            "top_grade".into(),
            self.rows.iter().map(|row| row.top_grade().map(HolcGrade::label)).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            "neighborhood".into(),
            self.rows.iter().map(|row| row.deed.neighborhood.as_str()).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            "restriction".into(),
            self.rows.iter().map(|row| row.deed.restriction.label()).collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            "degree".into(),
            self.rows.iter().map(|row| row.deed.degree.label()).collect::<Vec<_>>(),
        ));

        DataFrame::new(columns).context("[study] Failed to build study table")
    }

    /// Write the wide table to a CSV file.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut df = self.to_dataframe()?;
        write_csv(&mut df, path)
    }
}
