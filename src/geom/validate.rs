use std::fmt;

use geo::{Area, CoordsIter, MultiPolygon};
use thiserror::Error;

/// Why a geometry cannot be used as an apportionment denominator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegenerateReason {
    /// No polygons, or only polygons without an exterior ring.
    Empty,
    /// Polygons are present but enclose no area.
    ZeroArea,
    /// A coordinate is NaN or infinite.
    NonFinite,
    /// The source feature is not a polygon (point, polyline, ...).
    NonPolygonal(String),
    /// An interior ring appeared before any exterior ring.
    OrphanHole,
}

impl fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateReason::Empty => f.write_str("geometry is empty"),
            DegenerateReason::ZeroArea => f.write_str("geometry has zero area"),
            DegenerateReason::NonFinite => f.write_str("geometry has non-finite coordinates"),
            DegenerateReason::NonPolygonal(kind) => write!(f, "expected a polygon, found {kind}"),
            DegenerateReason::OrphanHole => f.write_str("interior ring without an exterior ring"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("degenerate geometry for {id}: {reason}")]
pub struct DegenerateGeometryError {
    pub id: String,
    pub reason: DegenerateReason,
}

impl DegenerateGeometryError {
    pub fn new(id: impl Into<String>, reason: DegenerateReason) -> Self {
        Self { id: id.into(), reason }
    }
}

/// Returns the planar area of `shape`, or the reason it cannot be divided by.
pub fn checked_area(shape: &MultiPolygon<f64>) -> Result<f64, DegenerateReason> {
    if shape.0.iter().all(|poly| poly.exterior().0.is_empty()) {
        return Err(DegenerateReason::Empty);
    }
    check_finite(shape)?;

    let area = shape.unsigned_area();
    if area > 0.0 { Ok(area) } else { Err(DegenerateReason::ZeroArea) }
}

/// Every coordinate of `shape` must be finite before it enters an overlay.
/// Empty and zero-area shapes pass; they simply overlap nothing.
pub fn check_finite(shape: &MultiPolygon<f64>) -> Result<(), DegenerateReason> {
    if shape.coords_iter().all(|c| c.x.is_finite() && c.y.is_finite()) {
        Ok(())
    } else {
        Err(DegenerateReason::NonFinite)
    }
}
