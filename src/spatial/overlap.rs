//! Overlap resolution shared by zone and restriction matching
//!
//! Candidates are pre-filtered with an R-tree over their bounding boxes, then
//! intersected exactly with the target. Results are ranked by overlap percent;
//! equal percentages keep input order so the first-listed candidate wins.

use super::engine::PlanarEngine;
use super::types::{CandidateZone, RestrictionCandidate};
use geo::MultiPolygon;
use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use std::cmp::Reverse;

/// Anything that may carry a planar footprint
pub trait Footprint {
    fn footprint(&self) -> Option<&MultiPolygon<f64>>;
}

impl Footprint for CandidateZone {
    fn footprint(&self) -> Option<&MultiPolygon<f64>> {
        self.geometry.as_ref()
    }
}

impl Footprint for RestrictionCandidate {
    fn footprint(&self) -> Option<&MultiPolygon<f64>> {
        self.geometry.as_ref()
    }
}

impl Footprint for MultiPolygon<f64> {
    fn footprint(&self) -> Option<&MultiPolygon<f64>> {
        Some(self)
    }
}

/// The candidate's footprint, unless it is missing, empty or has no area
pub(crate) fn usable_footprint<'c, C: Footprint>(
    engine: &PlanarEngine,
    candidate: &'c C,
) -> Option<&'c MultiPolygon<f64>> {
    candidate
        .footprint()
        .filter(|shape| !shape.0.is_empty() && engine.area(shape) > 0.0)
}

/// One candidate's overlap with the target
#[derive(Debug, Clone)]
pub struct Overlap<'a, C> {
    /// Position of the candidate in the input list
    pub index: usize,
    pub candidate: &'a C,
    pub intersection: MultiPolygon<f64>,
    pub overlap_area: f64,
    pub overlap_percent: f64,
}

/// Candidate bounding box for the R-tree pre-filter
#[derive(Clone, Debug)]
struct CandidateEnvelope {
    index: usize,
    bounds: AABB<[f64; 2]>,
}

impl RTreeObject for CandidateEnvelope {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

/// Percentages closer than this are treated as equal when ranking
const PERCENT_QUANTUM: f64 = 1e-9;

fn rank_key(percent: f64) -> Reverse<i64> {
    Reverse((percent / PERCENT_QUANTUM).round() as i64)
}

/// Rank every candidate that overlaps `target` with non-zero area.
///
/// Returned in descending `overlap_percent`; ties keep input order.
pub fn resolve<'a, C: Footprint>(
    engine: &PlanarEngine,
    target: &MultiPolygon<f64>,
    candidates: &'a [C],
) -> Vec<Overlap<'a, C>> {
    let target_area = engine.area(target);
    let Some(target_bounds) = engine.bounds(target) else {
        return Vec::new();
    };
    if target_area <= 0.0 {
        return Vec::new();
    }

    let envelopes: Vec<CandidateEnvelope> = candidates
        .iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let Some(rect) = usable_footprint(engine, candidate).and_then(|f| engine.bounds(f)) else {
                debug!("Candidate #{} has no usable geometry, skipped", index);
                return None;
            };
            Some(CandidateEnvelope {
                index,
                bounds: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            })
        })
        .collect();
    let tree = RTree::bulk_load(envelopes);

    let query = AABB::from_corners(
        [target_bounds.min().x, target_bounds.min().y],
        [target_bounds.max().x, target_bounds.max().y],
    );
    let mut hits: Vec<usize> = tree
        .locate_in_envelope_intersecting(&query)
        .map(|e| e.index)
        .collect();
    // R-tree iteration order is structural; restore input order for the tie-break
    hits.sort_unstable();
    debug!("{} of {} candidate(s) pass the bounding-box filter", hits.len(), candidates.len());

    let mut overlaps: Vec<Overlap<'a, C>> = hits
        .into_iter()
        .filter_map(|index| {
            let candidate = &candidates[index];
            let footprint = usable_footprint(engine, candidate)?;
            if !engine.intersects(target, footprint) {
                return None;
            }
            let intersection = engine.intersection(target, footprint);
            let overlap_area = engine.area(&intersection);
            if overlap_area <= 0.0 {
                return None;
            }
            Some(Overlap {
                index,
                candidate,
                intersection,
                overlap_area,
                overlap_percent: overlap_area / target_area * 100.0,
            })
        })
        .collect();

    // Stable sort keeps the first-encountered candidate ahead on ties
    overlaps.sort_by_key(|o| rank_key(o.overlap_percent));
    overlaps
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x1, y: y0),
            (x: x1, y: y1),
            (x: x0, y: y1),
        ]])
    }

    #[test]
    fn test_ranked_descending() {
        let engine = PlanarEngine::default();
        let target = rect(0.0, 0.0, 100.0, 100.0);
        let candidates = vec![
            rect(-10.0, -10.0, 20.0, 110.0),
            rect(20.0, -10.0, 110.0, 110.0),
            rect(500.0, 500.0, 600.0, 600.0),
        ];
        let overlaps = resolve(&engine, &target, &candidates);
        assert_eq!(overlaps.len(), 2);
        assert_eq!(overlaps[0].index, 1);
        assert!((overlaps[0].overlap_percent - 80.0).abs() < 1e-6);
        assert_eq!(overlaps[1].index, 0);
        assert!((overlaps[1].overlap_percent - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_equal_overlap_keeps_input_order() {
        let engine = PlanarEngine::default();
        let target = rect(0.0, 0.0, 100.0, 100.0);
        let candidates = vec![
            rect(50.0, -10.0, 110.0, 110.0),
            rect(-10.0, -10.0, 50.0, 110.0),
        ];
        let overlaps = resolve(&engine, &target, &candidates);
        assert_eq!(overlaps.len(), 2);
        assert_eq!(overlaps[0].index, 0);

        let reversed = vec![candidates[1].clone(), candidates[0].clone()];
        let overlaps = resolve(&engine, &target, &reversed);
        assert_eq!(overlaps[0].index, 0);
        assert_eq!(overlaps[0].candidate, &reversed[0]);
    }

    #[test]
    fn test_touching_candidate_excluded() {
        let engine = PlanarEngine::default();
        let target = rect(0.0, 0.0, 100.0, 100.0);
        let candidates = vec![rect(100.0, 0.0, 200.0, 100.0)];
        assert!(resolve(&engine, &target, &candidates).is_empty());
    }

    #[test]
    fn test_missing_geometry_skipped() {
        let engine = PlanarEngine::default();
        let target = rect(0.0, 0.0, 100.0, 100.0);
        let candidates = vec![
            CandidateZone {
                code: "X".into(),
                name: "no geometry".into(),
                geometry: None,
            },
            CandidateZone {
                code: "E".into(),
                name: "empty geometry".into(),
                geometry: Some(MultiPolygon::new(vec![])),
            },
            CandidateZone {
                code: "Y".into(),
                name: "covers".into(),
                geometry: Some(rect(-1.0, -1.0, 101.0, 101.0)),
            },
        ];
        let overlaps = resolve(&engine, &target, &candidates);
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].candidate.code, "Y");
        assert_eq!(overlaps[0].index, 2);
    }
}
