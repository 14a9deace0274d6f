//! Shapefile reading operations.

use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{self as shp, dbase::{FieldValue, Record}, Shape};
use tracing::{info, warn};

use crate::{
    geom::{check_finite, DegenerateGeometryError, DegenerateReason, GradedRegion},
    types::{HolcGrade, TractId},
};

/// Reads all shapes + attribute records from a given `.shp` file path.
pub(crate) fn read_shapefile(path: &Path) -> Result<Vec<(Shape, Record)>> {
    let mut reader = shp::Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let mut items = Vec::with_capacity(reader.shape_count()?);
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result
            .with_context(|| format!("[io::shp] Error reading shape+record from {}", path.display()))?;
        items.push((shape, record));
    }
    Ok(items)
}

/// Get the trimmed value of a character field, or `None` if absent or null.
fn character_field(record: &Record, field: &str) -> Option<String> {
    match record.get(field) {
        Some(FieldValue::Character(Some(s))) => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Loads census tract polygons keyed by the `id_field` attribute (e.g. `GEO_ID`).
/// Every feature must carry an id and a polygon.
pub fn read_tracts(path: &Path, id_field: &str) -> Result<Vec<(TractId, MultiPolygon<f64>)>> {
    let tracts = read_shapefile(path)?.into_iter()
        .enumerate()
        .map(|(i, (shape, record))| -> Result<(TractId, MultiPolygon<f64>)> {
            let Some(id) = character_field(&record, id_field) else {
                bail!("[io::shp] Feature {i} in {} has no {id_field:?} attribute", path.display());
            };
            let geom = shape_to_multipolygon(&id, shape)?;
            Ok((TractId::new(&id), geom))
        })
        .collect::<Result<Vec<_>>>()?;

    info!(path = %path.display(), tracts = tracts.len(), "loaded tract geometries");
    Ok(tracts)
}

/// Loads historical grade polygons labeled by the `grade_field` attribute (e.g. `holc_grade`).
/// Features with a missing or unrecognized grade, or no geometry, are skipped.
pub fn read_graded_regions(path: &Path, grade_field: &str) -> Result<Vec<GradedRegion>> {
    let regions = graded_regions_from_features(read_shapefile(path)?, grade_field)
        .with_context(|| format!("[io::shp] Invalid graded region in {}", path.display()))?;

    info!(path = %path.display(), regions = regions.len(), "loaded graded regions");
    Ok(regions)
}

fn graded_regions_from_features(
    features: Vec<(Shape, Record)>,
    grade_field: &str,
) -> Result<Vec<GradedRegion>, DegenerateGeometryError> {
    let mut regions = Vec::new();
    for (i, (shape, record)) in features.into_iter().enumerate() {
        let label = character_field(&record, grade_field);
        let Some(grade) = label.as_deref().and_then(HolcGrade::parse) else {
            warn!(feature = i, label = ?label, "skipping region without a recognized grade");
            continue;
        };
        if matches!(shape, Shape::NullShape) {
            warn!(feature = i, grade = %grade, "skipping region without geometry");
            continue;
        }
        let id = format!("region #{i}");
        let shape = shape_to_multipolygon(&id, shape)?;
        check_finite(&shape).map_err(|reason| DegenerateGeometryError::new(id, reason))?;
        regions.push(GradedRegion::new(grade, shape));
    }
    Ok(regions)
}

/// Convert a polygon shape into a geo MultiPolygon; anything else is degenerate.
pub(crate) fn shape_to_multipolygon(id: &str, shape: Shape) -> Result<MultiPolygon<f64>, DegenerateGeometryError> {
    match shape {
        Shape::Polygon(polygon) => shp_to_geo(&polygon)
            .map_err(|reason| DegenerateGeometryError::new(id, reason)),
        Shape::NullShape => Err(DegenerateGeometryError::new(id, DegenerateReason::Empty)),
        other => Err(DegenerateGeometryError::new(
            id,
            DegenerateReason::NonPolygonal(format!("{:?}", other.shapetype())),
        )),
    }
}

/// Group shapefile rings into polygons: each outer ring owns the inner rings
/// that follow it, which is the order shapefiles store them in.
fn shp_to_geo(p: &shp::Polygon) -> Result<MultiPolygon<f64>, DegenerateReason> {
    fn ring(points: &[shp::Point]) -> LineString<f64> {
        LineString::new(points.iter().map(|pt| Coord { x: pt.x, y: pt.y }).collect())
    }

    let mut polys: Vec<Polygon<f64>> = Vec::new();
    let mut exterior: Option<LineString<f64>> = None;
    let mut holes: Vec<LineString<f64>> = Vec::new();

    for r in p.rings() {
        match r {
            shp::PolygonRing::Outer(points) => {
                if let Some(ext) = exterior.replace(ring(points)) {
                    polys.push(Polygon::new(ext, std::mem::take(&mut holes)));
                }
            }
            shp::PolygonRing::Inner(points) => {
                if exterior.is_none() {
                    return Err(DegenerateReason::OrphanHole);
                }
                holes.push(ring(points));
            }
        }
    }
    if let Some(ext) = exterior {
        polys.push(Polygon::new(ext, holes));
    }

    Ok(MultiPolygon::new(polys))
}
