//! Format-specific reading and writing.
//!
//! - `csv` - delimited tables (census race counts, deed restrictions, output)
//! - `shp` - ESRI shapefiles (tract and grade polygons)

pub(crate) mod csv;
pub(crate) mod shp;

pub use self::csv::write_csv;
pub use self::shp::{read_graded_regions, read_tracts};
