//! Restriction zone intersection and capital object lookup
//!
//! Restrictions keep the exact part of their geometry that lies inside the
//! parcel, including every disjoint piece. The label anchor is taken from the
//! largest intersecting piece only.

use super::builder::largest_part;
use super::classify::classify;
use super::engine::PlanarEngine;
use super::overlap::{resolve, usable_footprint};
use super::types::{
    CapitalObject, CapitalObjectCandidate, ObjectGeometry, ParcelGeometry, RestrictionCandidate,
    RestrictionZone,
};
use crate::error::Warning;
use log::{debug, info, warn};

/// Intersect restriction candidates with the parcel.
///
/// Candidates without geometry, or with an empty or zero-area one, are
/// skipped with a warning. Overlaps smaller
/// than `min_area` are dropped as boundary slivers. Output is ordered by
/// descending overlap, first-listed first on ties.
pub fn intersect_restrictions(
    engine: &PlanarEngine,
    parcel: &ParcelGeometry,
    candidates: &[RestrictionCandidate],
    min_area: f64,
    warnings: &mut Vec<Warning>,
) -> Vec<RestrictionZone> {
    for (index, candidate) in candidates.iter().enumerate() {
        if usable_footprint(engine, candidate).is_none() {
            warn!(
                "Restriction #{} ({}) has no geometry, skipped",
                index,
                candidate.name.as_deref().unwrap_or("unnamed")
            );
            warnings.push(Warning::RestrictionWithoutGeometry {
                index,
                name: candidate.name.clone(),
            });
        }
    }

    let zones: Vec<RestrictionZone> = resolve(engine, &parcel.shape, candidates)
        .into_iter()
        .filter(|o| {
            let keep = o.overlap_area >= min_area;
            if !keep {
                debug!(
                    "Restriction #{} overlaps only {:.3} sq m, dropped",
                    o.index, o.overlap_area
                );
            }
            keep
        })
        .map(|o| {
            let source = o.candidate;
            let label_point = largest_part(engine, o.intersection.0.clone())
                .and_then(|part| engine.interior_point(&part));
            RestrictionZone {
                zone_type: source.zone_type.clone(),
                name: source.name.clone(),
                registry_number: source.registry_number.clone(),
                decision_number: source.decision_number.clone(),
                decision_date: source.decision_date.clone(),
                decision_authority: source.decision_authority.clone(),
                category: classify(source.name.as_deref().unwrap_or(&source.zone_type)),
                intersection_geometry: o.intersection,
                intersection_area: o.overlap_area,
                label_point,
            }
        })
        .collect();

    info!(
        "{} of {} restriction(s) intersect the parcel",
        zones.len(),
        candidates.len()
    );
    zones
}

/// Capital objects whose geometry touches the parcel, in input order
pub fn find_capital_objects(
    engine: &PlanarEngine,
    parcel: &ParcelGeometry,
    candidates: &[CapitalObjectCandidate],
) -> Vec<CapitalObject> {
    let found: Vec<CapitalObject> = candidates
        .iter()
        .filter_map(|candidate| {
            let geometry = candidate.geometry.as_ref()?;
            let on_parcel = match geometry {
                ObjectGeometry::Point(point) => engine.contains_point(&parcel.shape, point),
                ObjectGeometry::Region(region) => engine.intersects(&parcel.shape, region),
            };
            on_parcel.then(|| CapitalObject {
                cadnum: candidate.cadnum.clone(),
                object_type: candidate.object_type.clone(),
                purpose: candidate.purpose.clone(),
                area: candidate.area,
                floors: candidate.floors,
                geometry: geometry.clone(),
            })
        })
        .collect();

    info!("{} capital object(s) on the parcel", found.len());
    found
}

/// Composite description: registry number, decision and overlap area
pub fn describe_restriction(zone: &RestrictionZone) -> String {
    let mut parts = Vec::new();

    if let Some(registry) = non_empty(&zone.registry_number) {
        parts.push(format!("Реестровый номер: {registry}"));
    }

    let decision: Vec<String> = [
        non_empty(&zone.decision_number).map(|n| format!("№{n}")),
        non_empty(&zone.decision_date).map(|d| format!("от {d}")),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !decision.is_empty() {
        let authority = non_empty(&zone.decision_authority).unwrap_or("Решение");
        parts.push(format!("{}: {}", authority, decision.join(" ")));
    }

    if zone.intersection_area > 0.0 {
        parts.push(format!("Площадь пересечения: {:.2} кв.м", zone.intersection_area));
    }

    if parts.is_empty() {
        "Ограничения использования территории".to_string()
    } else {
        parts.join("; ")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
