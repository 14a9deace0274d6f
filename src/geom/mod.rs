mod apportion;
mod coverage;
mod validate;

pub use apportion::{apportion, apportion_all, CoverageColumn, OverlayMode, FRACTION_DECIMALS};
pub use coverage::{residual, CoverageRow, CoverageTable};
pub use validate::{check_finite, checked_area, DegenerateGeometryError, DegenerateReason};

use ahash::AHashMap;
use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::{RTree, RTreeObject, AABB};
use thiserror::Error;

use crate::types::{HolcGrade, TractId};

#[derive(Debug, Clone)]
struct BoundingBox {
    idx: usize, // Index of corresponding MultiPolygon in shapes
    bbox: Rect<f64>,
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// A list of polygons with an R-tree over their bounding boxes.
#[derive(Debug, Clone)]
pub struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes have no bounding box and are never returned as candidates.
    pub fn new(shapes: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(shapes.iter().enumerate()
                .filter_map(|(idx, shape)| shape.bounding_rect().map(|bbox| BoundingBox { idx, bbox }))
                .collect()),
            shapes,
        }
    }

    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    #[inline] pub fn shape(&self, idx: usize) -> &MultiPolygon<f64> { &self.shapes[idx] }

    /// Indices of shapes whose bounding box meets `rect`, in ascending order
    /// so callers fold over them in input order.
    pub fn candidates(&self, rect: &Rect<f64>) -> Vec<usize> {
        let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
        let mut found = self.rtree
            .locate_in_envelope_intersecting(&envelope)
            .map(|bb| bb.idx)
            .collect::<Vec<_>>();
        found.sort_unstable();
        found
    }
}

/// A historical boundary polygon tagged with its HOLC grade.
#[derive(Debug, Clone, PartialEq)]
pub struct GradedRegion {
    pub grade: HolcGrade,
    pub shape: MultiPolygon<f64>,
}

impl GradedRegion {
    pub fn new(grade: HolcGrade, shape: MultiPolygon<f64>) -> Self {
        Self { grade, shape }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TractSetError {
    #[error("duplicate tract identifier: {0}")]
    Duplicate(TractId),
}

/// Census tracts keyed by identifier, in load order.
/// Geometry is fixed at construction and never mutated.
#[derive(Debug, Clone)]
pub struct TractSet {
    ids: Vec<TractId>,
    shapes: Vec<MultiPolygon<f64>>,
    index: AHashMap<TractId, usize>,
}

impl TractSet {
    pub fn new(tracts: impl IntoIterator<Item = (TractId, MultiPolygon<f64>)>) -> Result<Self, TractSetError> {
        let mut set = Self { ids: Vec::new(), shapes: Vec::new(), index: AHashMap::new() };
        for (id, shape) in tracts {
            if set.index.insert(id.clone(), set.ids.len()).is_some() {
                return Err(TractSetError::Duplicate(id));
            }
            set.ids.push(id);
            set.shapes.push(shape);
        }
        Ok(set)
    }

    #[inline] pub fn len(&self) -> usize { self.ids.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    #[inline] pub fn ids(&self) -> &[TractId] { &self.ids }

    #[inline] pub fn contains(&self, id: &TractId) -> bool { self.index.contains_key(id) }

    pub fn get(&self, id: &TractId) -> Option<&MultiPolygon<f64>> {
        self.index.get(id).map(|&i| &self.shapes[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TractId, &MultiPolygon<f64>)> {
        self.ids.iter().zip(&self.shapes)
    }

    /// Keep only the tracts whose identifier satisfies `keep`, preserving order.
    pub fn filter(self, keep: impl Fn(&TractId) -> bool) -> Self {
        let (ids, shapes): (Vec<_>, Vec<_>) = self.ids.into_iter()
            .zip(self.shapes)
            .filter(|(id, _)| keep(id))
            .unzip();
        let index = ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect();
        Self { ids, shapes, index }
    }
}
