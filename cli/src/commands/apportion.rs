use std::path::PathBuf;

use anyhow::Result;
use redline::{apportion_all, ensure_writable, read_graded_regions, read_tracts, write_csv, TractSet};
use tracing::info;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ApportionArgs) -> Result<()> {
    let out_path = args.output.clone().unwrap_or_else(|| PathBuf::from("./coverage.csv"));
    ensure_writable(&out_path, args.force)?;

    let tracts = TractSet::new(read_tracts(&args.tracts, &args.id_field)?)?;
    let regions = read_graded_regions(&args.grades, &args.grade_field)?;

    let table = apportion_all(&tracts, &regions, args.overlay.into())?;
    info!(redlined = table.redlined().count(), tracts = table.len(), "coverage complete");

    let mut df = table.to_dataframe()?;
    write_csv(&mut df, &out_path)?;
    info!(path = %out_path.display(), "wrote coverage table");

    Ok(())
}
