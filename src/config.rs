//! JSON run configuration for a study.
//!
//! Only the input paths are required; everything else defaults to the layout
//! of the ACS B02001 downloads, the 2010 cartographic tract shapefile, and the
//! Mapping Inequality HOLC shapefile.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    census::{RaceColumns, ZeroPopulationPolicy},
    deeds::DeedColumns,
    geom::OverlayMode,
    types::COUNTY_PREFIX,
};

/// One census race table and the year it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RaceTableSource {
    pub year: u16,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StudyConfig {
    pub race_tables: Vec<RaceTableSource>,
    pub tracts_shapefile: PathBuf,
    pub grades_shapefile: PathBuf,
    #[serde(default)]
    pub deeds_csv: Option<PathBuf>,

    #[serde(default = "default_tract_id_field")]
    pub tract_id_field: String,
    #[serde(default = "default_grade_field")]
    pub grade_field: String,
    /// Lines above the header row in each race table.
    #[serde(default = "default_race_header_skip")]
    pub race_header_skip: usize,
    #[serde(default)]
    pub race_columns: RaceColumns,
    #[serde(default)]
    pub deed_columns: DeedColumns,
    #[serde(default = "default_county_prefix")]
    pub county_prefix: String,

    /// Year defining the study area and the start of each change; defaults to the earliest table.
    #[serde(default)]
    pub baseline_year: Option<u16>,
    /// End year of each change; defaults to the latest table.
    #[serde(default)]
    pub comparison_year: Option<u16>,

    #[serde(default)]
    pub overlay_mode: OverlayMode,
    #[serde(default)]
    pub zero_population: ZeroPopulationPolicy,
}

fn default_tract_id_field() -> String { "GEO_ID".into() }
fn default_grade_field() -> String { "holc_grade".into() }
fn default_race_header_skip() -> usize { 1 }
fn default_county_prefix() -> String { COUNTY_PREFIX.into() }

impl StudyConfig {
    /// Parse a JSON config. Relative input paths resolve against `base_dir`.
    pub fn from_json(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: StudyConfig = serde_json::from_str(text)
            .context("[config] Invalid study configuration")?;
        config.resolve_paths(base_dir);
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file; relative paths resolve against its directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json(&text, base_dir)
            .with_context(|| format!("[config] Failed to load {}", path.display()))
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |p: &mut PathBuf| if p.is_relative() { *p = base_dir.join(&*p) };
        self.race_tables.iter_mut().for_each(|t| resolve(&mut t.path));
        resolve(&mut self.tracts_shapefile);
        resolve(&mut self.grades_shapefile);
        if let Some(p) = self.deeds_csv.as_mut() { resolve(p) }
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.race_tables.is_empty(), "[config] at least one race table is required");

        let years = self.years();
        ensure!(years.len() == self.race_tables.len(), "[config] race tables must have distinct years");
        for year in [self.baseline_year, self.comparison_year].into_iter().flatten() {
            ensure!(years.contains(&year), "[config] year {year} has no race table");
        }
        let (baseline, comparison) = (self.baseline(), self.comparison());
        ensure!(
            baseline < comparison,
            "[config] baseline year {baseline} must precede comparison year {comparison}; \
             changes need two race tables"
        );
        Ok(())
    }

    fn years(&self) -> BTreeSet<u16> {
        self.race_tables.iter().map(|t| t.year).collect()
    }

    /// Baseline year: configured, else the earliest race table.
    pub fn baseline(&self) -> u16 {
        self.baseline_year
            .or_else(|| self.years().first().copied())
            .unwrap_or_default()
    }

    /// Comparison year: configured, else the latest race table.
    pub fn comparison(&self) -> u16 {
        self.comparison_year
            .or_else(|| self.years().last().copied())
            .unwrap_or_default()
    }
}
