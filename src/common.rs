use std::path::Path;

use anyhow::{bail, Result};

/// Round `value` half away from zero to `decimals` places.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Error if `path` already exists and `force` is not set; error if it names a directory.
pub fn ensure_writable(path: &Path, force: bool) -> Result<()> {
    if path.is_dir() {
        bail!("Output path is a directory: {}", path.display());
    }
    if path.exists() && !force {
        bail!("Output file already exists (pass --force to overwrite): {}", path.display());
    }
    Ok(())
}
