//! Parcel and setback construction
//!
//! Contours become independent rings. Invalid unions are repaired and, when
//! repair or offsetting splits the region, only the largest part survives.

use super::engine::PlanarEngine;
use super::types::{Contour, ParcelGeometry, Setback};
use crate::error::{AnalysisError, Stage, Warning};
use geo::{LineString, MultiPolygon, Polygon};
use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Count distinct planar positions (bitwise equality on the parsed values)
fn distinct_points<'a>(coords: impl Iterator<Item = &'a geo::Coord<f64>>) -> usize {
    coords
        .map(|c| (c.x.to_bits(), c.y.to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

/// Close a contour into a ring, dropping consecutive duplicates
fn contour_ring(contour: &Contour) -> Vec<geo::Coord<f64>> {
    let mut ring: Vec<geo::Coord<f64>> = Vec::with_capacity(contour.len() + 1);
    for point in contour {
        if ring.last() != Some(&point.location) {
            ring.push(point.location);
        }
    }
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Build the parcel outline from normalized contours
pub fn build_parcel(
    engine: &PlanarEngine,
    contours: &[Contour],
    warnings: &mut Vec<Warning>,
) -> Result<ParcelGeometry, AnalysisError> {
    let total = distinct_points(contours.iter().flatten().map(|c| &c.location));
    if total < 3 {
        return Err(AnalysisError::InsufficientGeometry {
            distinct_points: total,
        });
    }

    let mut polygons = Vec::with_capacity(contours.len());
    for (index, contour) in contours.iter().enumerate() {
        let ring = contour_ring(contour);
        let distinct = distinct_points(ring.iter());
        if distinct < 3 {
            warn!("Contour {} has only {} distinct points, skipped", index, distinct);
            warnings.push(Warning::ContourTooShort {
                contour: index,
                distinct_points: distinct,
            });
            continue;
        }
        polygons.push(Polygon::new(LineString::from(ring), vec![]));
    }

    if polygons.is_empty() {
        return Err(AnalysisError::InsufficientGeometry {
            distinct_points: total,
        });
    }

    let mut shape = MultiPolygon::new(polygons);
    if !engine.is_valid(&shape) {
        debug!("Parcel rings are invalid, repairing");
        let repaired = engine.repair(&shape);
        if repaired.0.is_empty() {
            return Err(AnalysisError::GeometryRepairFailed {
                reason: "repair produced an empty region".to_string(),
            });
        }
        if !engine.is_valid(&repaired) {
            return Err(AnalysisError::GeometryRepairFailed {
                reason: "repaired region is still invalid".to_string(),
            });
        }
        shape = if repaired.0.len() > 1 {
            let (kept, discarded) = keep_largest(engine, repaired, Stage::BuildParcel, warnings);
            debug!("Repair split the parcel, discarded {} part(s)", discarded);
            MultiPolygon::new(vec![kept])
        } else {
            repaired
        };
    }

    let area = engine.area(&shape);
    if area <= 0.0 {
        return Err(AnalysisError::GeometryRepairFailed {
            reason: "parcel has zero area".to_string(),
        });
    }

    info!("Built parcel: {} part(s), area {:.2}", shape.0.len(), area);
    Ok(ParcelGeometry { shape, area })
}

/// Inward offset of the parcel; `distance` is applied as a shrink regardless of sign
pub fn build_setback(
    engine: &PlanarEngine,
    parcel: &ParcelGeometry,
    distance: f64,
    miter_limit: f64,
    warnings: &mut Vec<Warning>,
) -> Setback {
    let offset = engine.offset(&parcel.shape, -distance.abs(), miter_limit);
    let parts: Vec<Polygon<f64>> = offset
        .into_iter()
        .filter(|p| engine.polygon_area(p) > 0.0)
        .collect();

    if parts.is_empty() {
        warn!("Setback of {} consumed the whole parcel", distance);
        warnings.push(Warning::EmptySetback { distance });
        return Setback::Empty;
    }

    let polygon = if parts.len() > 1 {
        keep_largest(engine, MultiPolygon::new(parts), Stage::BuildSetback, warnings).0
    } else {
        let mut parts = parts;
        parts.remove(0)
    };
    let area = engine.polygon_area(&polygon);
    info!("Built setback: area {:.2}", area);
    Setback::Region { polygon, area }
}

fn keep_largest(
    engine: &PlanarEngine,
    shape: MultiPolygon<f64>,
    stage: Stage,
    warnings: &mut Vec<Warning>,
) -> (Polygon<f64>, usize) {
    let discarded = shape.0.len().saturating_sub(1);
    let kept = largest_part(engine, shape.0);
    let kept_area = kept.as_ref().map(|p| engine.polygon_area(p)).unwrap_or(0.0);
    warn!("{}: kept largest part ({:.2}), discarded {}", stage, kept_area, discarded);
    warnings.push(Warning::PartsDiscarded {
        stage,
        kept_area,
        discarded,
    });
    (kept.unwrap_or_else(|| Polygon::new(LineString::new(vec![]), vec![])), discarded)
}

/// Largest-area part; equal areas fall back to the smaller centroid x, then y
pub(crate) fn largest_part(engine: &PlanarEngine, parts: Vec<Polygon<f64>>) -> Option<Polygon<f64>> {
    let ranked = parts.into_iter().map(|p| {
        let area = engine.polygon_area(&p);
        let centre = engine.centroid(&p).map(|c| (c.x(), c.y())).unwrap_or((0.0, 0.0));
        (area, centre, p)
    });

    ranked
        .reduce(|best, next| {
            let by_area = next.0.total_cmp(&best.0);
            let wins = match by_area {
                Ordering::Greater => true,
                Ordering::Less => false,
                Ordering::Equal => (next.1 .0, next.1 .1)
                    .partial_cmp(&(best.1 .0, best.1 .1))
                    .map(|o| o == Ordering::Less)
                    .unwrap_or(false),
            };
            if wins { next } else { best }
        })
        .map(|(_, _, p)| p)
}
