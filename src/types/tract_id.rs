use std::{fmt, sync::Arc};

/// GEO_ID prefix shared by every 2010 tract in Harris County, TX:
/// summary level `1400000US`, state `48`, county `201`.
pub const COUNTY_PREFIX: &str = "1400000US48201";

/// Width of the tract code that follows the county in a GEO_ID.
const TRACT_CODE_LEN: usize = 6;

/// Stable key for a census tract.
/// Keeps the original GEO_ID text (with leading zeros) without repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TractId(Arc<str>);

impl TractId {
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id.trim()))
    }

    /// Rebuild a full GEO_ID from a county prefix and a bare tract number, e.g.
    /// `("1400000US48201", "510100")` -> `"1400000US48201510100"`.
    /// Numeric fragments shorter than the six-digit tract code are zero-padded.
    pub fn from_fragment(prefix: &str, fragment: &str) -> Self {
        let fragment = fragment.trim();
        let is_numeric = !fragment.is_empty() && fragment.bytes().all(|b| b.is_ascii_digit());
        if is_numeric && fragment.len() < TRACT_CODE_LEN {
            Self::new(&format!("{prefix}{fragment:0>width$}", width = TRACT_CODE_LEN))
        } else {
            Self::new(&format!("{prefix}{fragment}"))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TractId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}
