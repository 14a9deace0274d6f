use std::path::PathBuf;

use anyhow::Result;
use redline::{census::RaceGroup, ensure_writable, Study, StudyConfig};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::StudyArgs) -> Result<()> {
    let out_path = args.output.clone().unwrap_or_else(|| PathBuf::from("./study.csv"));
    ensure_writable(&out_path, args.force)?;

    let config = StudyConfig::from_path(&args.config)?;
    info!(
        baseline = config.baseline(),
        comparison = config.comparison(),
        overlay = ?config.overlay_mode,
        "running study"
    );
    let study = Study::from_config(&config)?;
    info!(rows = study.rows.len(), redlined = study.redlined().count(), "study joined");

    for (status, summary) in study.mean_change_by_restriction() {
        let [white, black, mixed, other] = RaceGroup::ALL.map(|group| summary.mean(group));
        info!(restriction = %status, rows = summary.rows, ?white, ?black, ?mixed, ?other, "mean race change");
    }

    study.write_csv(&out_path)?;
    info!(path = %out_path.display(), rows = study.rows.len(), "wrote study table");

    Ok(())
}
