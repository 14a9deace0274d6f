//! CSV reading and writing operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::prelude::*;

/// Reads a CSV file with every column typed as String, skipping `skip_rows`
/// lines before the header row.
pub(crate) fn read_csv_text(path: &Path, skip_rows: usize) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv] Failed to open CSV file: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(skip_rows)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv] Failed to read CSV from {}", path.display()))
}

/// Borrow a String column as optional cells, one per row.
pub(crate) fn text_column<'a>(df: &'a DataFrame, name: &str) -> Result<Vec<Option<&'a str>>> {
    let column = df.column(name)
        .with_context(|| format!("[io::csv] Missing column {name:?}; found {:?}", df.get_column_names()))?;
    let values = column.str()
        .with_context(|| format!("[io::csv] Column {name:?} must be of type String"))?;
    Ok(values.into_iter().collect())
}

/// Trimmed cell contents, with blank cells treated as missing.
#[inline]
pub(crate) fn non_blank(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|s| !s.is_empty())
}

/// Write a DataFrame to a CSV file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("[io::csv] Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(file)
        .finish(df)
        .with_context(|| format!("[io::csv] Failed to write CSV to {}", path.display()))
}
