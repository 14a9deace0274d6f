use std::collections::BTreeMap;

use geo::{Area, BooleanOps, BoundingRect, Intersects, MultiPolygon};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{check_finite, checked_area, CoverageTable, DegenerateGeometryError, Geometries, GradedRegion, TractSet};
use crate::{common::round_to, types::{HolcGrade, TractId}};

/// Decimal places kept on every coverage fraction.
pub const FRACTION_DECIMALS: i32 = 4;

/// How same-grade regions are combined before measuring overlap with a tract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMode {
    /// Sum `area(tract ∩ region) / area(tract)` over every intersecting region.
    /// Overlapping regions of one grade are counted twice, so a fraction may exceed 1.
    #[default]
    Summed,
    /// Union the grade's regions first; a fraction never exceeds 1.
    Dissolved,
}

/// Fraction of each tract covered by a single grade.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageColumn {
    pub grade: HolcGrade,
    pub fractions: BTreeMap<TractId, f64>,
}

impl CoverageColumn {
    #[inline]
    pub fn get(&self, tract: &TractId) -> Option<f64> {
        self.fractions.get(tract).copied()
    }
}

/// For every tract, compute the share of its area overlapped by `regions`,
/// all of which carry `grade`. Fails on the first tract that has no usable area.
pub fn apportion<'a>(
    tracts: &TractSet,
    regions: impl IntoIterator<Item = &'a MultiPolygon<f64>>,
    grade: HolcGrade,
    mode: OverlayMode,
) -> Result<CoverageColumn, DegenerateGeometryError> {
    // Validate every denominator before any overlay work.
    let areas = tracts.iter()
        .map(|(id, shape)| checked_area(shape).map_err(|reason| DegenerateGeometryError::new(id.as_str(), reason)))
        .collect::<Result<Vec<_>, _>>()?;

    // Overlay arithmetic cannot represent NaN or infinite vertices.
    let regions = regions.into_iter()
        .enumerate()
        .map(|(i, region)| check_finite(region)
            .map(|()| region)
            .map_err(|reason| DegenerateGeometryError::new(format!("{grade} region #{i}"), reason)))
        .collect::<Result<Vec<_>, _>>()?;

    let index = match mode {
        OverlayMode::Summed => Geometries::new(regions.into_iter().cloned().collect()),
        OverlayMode::Dissolved => Geometries::new(vec![dissolve(regions)]),
    };

    let fractions = tracts.iter()
        .zip(areas)
        .map(|((id, tract), area)| (id.clone(), round_to(covered_fraction(tract, area, &index), FRACTION_DECIMALS)))
        .collect::<BTreeMap<_, _>>();

    debug!(grade = %grade, regions = index.len(), tracts = fractions.len(), "apportioned grade");

    Ok(CoverageColumn { grade, fractions })
}

/// Run [`apportion`] once per grade and assemble the per-tract coverage table.
pub fn apportion_all(
    tracts: &TractSet,
    regions: &[GradedRegion],
    mode: OverlayMode,
) -> Result<CoverageTable, DegenerateGeometryError> {
    let columns = HolcGrade::ALL.iter()
        .map(|&grade| {
            let shapes = regions.iter().filter(|r| r.grade == grade).map(|r| &r.shape);
            apportion(tracts, shapes, grade, mode)
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(tracts = tracts.len(), regions = regions.len(), mode = ?mode, "computed grade coverage");

    Ok(CoverageTable::assemble(tracts, &columns))
}

/// Sum of per-region overlap ratios. Regions are visited in input order; those
/// whose bounding box or geometry misses the tract are skipped before any
/// intersection is computed.
fn covered_fraction(tract: &MultiPolygon<f64>, tract_area: f64, regions: &Geometries) -> f64 {
    let Some(rect) = tract.bounding_rect() else { return 0.0 };

    regions.candidates(&rect).into_iter()
        .map(|j| regions.shape(j))
        .filter(|region| tract.intersects(*region))
        .map(|region| tract.intersection(region).unsigned_area() / tract_area)
        .sum()
}

/// Union of all `regions`.
fn dissolve<'a>(regions: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> MultiPolygon<f64> {
    regions.into_iter()
        .fold(MultiPolygon::new(Vec::new()), |acc, region| acc.union(region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{test_shapes::rect, DegenerateReason};

    fn unit_tract(id: &str) -> TractSet {
        TractSet::new([(TractId::new(id), rect(0.0, 0.0, 1.0, 1.0))]).unwrap()
    }

    fn fraction(tracts: &TractSet, regions: &[MultiPolygon<f64>], mode: OverlayMode) -> f64 {
        let column = apportion(tracts, regions, HolcGrade::A, mode).unwrap();
        column.get(&tracts.ids()[0]).unwrap()
    }

    #[test]
    fn disjoint_region_contributes_zero() {
        let tracts = unit_tract("t");
        assert_eq!(fraction(&tracts, &[rect(2.0, 2.0, 3.0, 3.0)], OverlayMode::Summed), 0.0);
    }

    #[test]
    fn no_regions_gives_zero() {
        let tracts = unit_tract("t");
        assert_eq!(fraction(&tracts, &[], OverlayMode::Summed), 0.0);
        assert_eq!(fraction(&tracts, &[], OverlayMode::Dissolved), 0.0);
    }

    #[test]
    fn edge_touching_region_contributes_zero() {
        let tracts = unit_tract("t");
        assert_eq!(fraction(&tracts, &[rect(1.0, 0.0, 2.0, 1.0)], OverlayMode::Summed), 0.0);
    }

    #[test]
    fn covering_region_gives_one() {
        let tracts = unit_tract("t");
        let got = fraction(&tracts, &[rect(-1.0, -1.0, 2.0, 2.0)], OverlayMode::Summed);
        assert!((got - 1.0).abs() < 1e-4, "got {got}");
    }

    #[test]
    fn left_half_gives_one_half() {
        let tracts = unit_tract("t");
        let got = fraction(&tracts, &[rect(0.0, 0.0, 0.5, 1.0)], OverlayMode::Summed);
        assert!((got - 0.5).abs() <= 1e-4, "got {got}");
    }

    #[test]
    fn fractions_are_rounded_to_four_places() {
        let tracts = unit_tract("t");
        let got = fraction(&tracts, &[rect(0.0, 0.0, 1.0 / 3.0, 1.0)], OverlayMode::Summed);
        assert_eq!(got, 0.3333);
    }

    #[test]
    fn overlapping_same_grade_regions_are_double_counted() {
        // Each region covers 60% of the tract; they overlap on 20%.
        let tracts = unit_tract("t");
        let regions = [rect(0.0, 0.0, 0.6, 1.0), rect(0.4, 0.0, 1.0, 1.0)];
        let got = fraction(&tracts, &regions, OverlayMode::Summed);
        assert!((got - 1.2).abs() <= 1e-4, "got {got}");
    }

    #[test]
    fn dissolved_mode_unions_regions_first() {
        let tracts = unit_tract("t");
        let regions = [rect(0.0, 0.0, 0.6, 1.0), rect(0.4, 0.0, 1.0, 1.0)];
        let got = fraction(&tracts, &regions, OverlayMode::Dissolved);
        assert!((got - 1.0).abs() <= 1e-4, "got {got}");
    }

    #[test]
    fn region_order_does_not_change_result() {
        let tracts = TractSet::new([
            (TractId::new("a"), rect(0.0, 0.0, 1.0, 1.0)),
            (TractId::new("b"), rect(1.0, 0.0, 2.0, 1.0)),
        ]).unwrap();
        let mut regions = vec![rect(0.0, 0.0, 0.25, 1.0), rect(0.75, 0.0, 1.5, 1.0), rect(1.9, 0.0, 3.0, 1.0)];

        let forward = apportion(&tracts, &regions, HolcGrade::B, OverlayMode::Summed).unwrap();
        regions.reverse();
        let backward = apportion(&tracts, &regions, HolcGrade::B, OverlayMode::Summed).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward.get(&TractId::new("a")), Some(0.5));
        assert_eq!(forward.get(&TractId::new("b")), Some(0.6));
    }

    #[test]
    fn multipart_tract_uses_total_area() {
        let mut shape = rect(0.0, 0.0, 1.0, 1.0);
        shape.0.extend(rect(2.0, 0.0, 3.0, 1.0).0);
        let tracts = TractSet::new([(TractId::new("m"), shape)]).unwrap();

        let got = fraction(&tracts, &[rect(2.0, 0.0, 3.0, 1.0)], OverlayMode::Summed);
        assert_eq!(got, 0.5);
    }

    #[test]
    fn zero_area_tract_fails() {
        let tracts = TractSet::new([
            (TractId::new("ok"), rect(0.0, 0.0, 1.0, 1.0)),
            (TractId::new("flat"), rect(0.0, 0.0, 1.0, 0.0)),
        ]).unwrap();
        let err = apportion(&tracts, &[rect(0.0, 0.0, 1.0, 1.0)], HolcGrade::C, OverlayMode::Summed).unwrap_err();
        assert_eq!(err, DegenerateGeometryError::new("flat", DegenerateReason::ZeroArea));
    }

    #[test]
    fn empty_tract_fails() {
        let tracts = TractSet::new([(TractId::new("e"), MultiPolygon::new(vec![]))]).unwrap();
        let err = apportion(&tracts, &[rect(0.0, 0.0, 1.0, 1.0)], HolcGrade::D, OverlayMode::Summed).unwrap_err();
        assert_eq!(err.reason, DegenerateReason::Empty);
    }

    #[test]
    fn non_finite_region_fails_before_overlay() {
        let tracts = unit_tract("t");
        let regions = [rect(0.0, 0.0, 0.5, 1.0), rect(0.2, 0.0, f64::NAN, 1.0)];
        for mode in [OverlayMode::Summed, OverlayMode::Dissolved] {
            let err = apportion(&tracts, &regions, HolcGrade::A, mode).unwrap_err();
            assert_eq!(err, DegenerateGeometryError::new("A region #1", DegenerateReason::NonFinite));
        }

        let regions = vec![GradedRegion::new(HolcGrade::C, rect(0.0, f64::INFINITY, 1.0, 1.0))];
        let err = apportion_all(&tracts, &regions, OverlayMode::Summed).unwrap_err();
        assert_eq!(err.reason, DegenerateReason::NonFinite);
    }

    #[test]
    fn apportion_all_assembles_every_grade() {
        let tracts = unit_tract("t1");
        let regions = vec![
            GradedRegion::new(HolcGrade::A, rect(0.0, 0.0, 0.3, 1.0)),
            GradedRegion::new(HolcGrade::B, rect(0.3, 0.0, 0.5, 1.0)),
            GradedRegion::new(HolcGrade::D, rect(0.9, 0.0, 1.0, 1.0)),
        ];

        let table = apportion_all(&tracts, &regions, OverlayMode::Summed).unwrap();
        let row = table.get(&TractId::new("t1")).unwrap();
        assert_eq!(row.fraction(HolcGrade::A), 0.3);
        assert_eq!(row.fraction(HolcGrade::B), 0.2);
        assert_eq!(row.fraction(HolcGrade::C), 0.0);
        assert_eq!(row.fraction(HolcGrade::D), 0.1);
        assert!((row.unassigned - 0.4).abs() < 1e-9);
    }
}
