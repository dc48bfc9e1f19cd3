//! Territorial zone matching

use super::engine::PlanarEngine;
use super::overlap::resolve;
use super::types::{CandidateZone, OverlapMatch, ParcelGeometry, ZoneResolution};
use log::{info, warn};

/// Pick the zone with the largest overlap.
///
/// A parcel touching several zones is ambiguous unless the best one covers at
/// least `ambiguity_threshold` percent of it.
pub fn match_zone(
    engine: &PlanarEngine,
    parcel: &ParcelGeometry,
    zones: &[CandidateZone],
    ambiguity_threshold: f64,
) -> ZoneResolution {
    let all_matches: Vec<OverlapMatch> = resolve(engine, &parcel.shape, zones)
        .into_iter()
        .map(|o| OverlapMatch {
            code: o.candidate.code.clone(),
            name: o.candidate.name.clone(),
            overlap_area: o.overlap_area,
            overlap_percent: o.overlap_percent,
        })
        .collect();

    let Some(best) = all_matches.first().cloned() else {
        warn!("No zone out of {} intersects the parcel", zones.len());
        return ZoneResolution::default();
    };

    let is_ambiguous = all_matches.len() > 1 && best.overlap_percent < ambiguity_threshold;
    info!(
        "Zone {} covers {:.2}% of the parcel ({} match(es){})",
        best.code,
        best.overlap_percent,
        all_matches.len(),
        if is_ambiguous { ", ambiguous" } else { "" }
    );

    ZoneResolution {
        best: Some(best),
        all_matches,
        is_ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn parcel() -> ParcelGeometry {
        let shape = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
        ]]);
        ParcelGeometry { shape, area: 10_000.0 }
    }

    fn zone(code: &str, x0: f64, x1: f64) -> CandidateZone {
        CandidateZone {
            code: code.to_string(),
            name: format!("Zone {code}"),
            geometry: Some(MultiPolygon::new(vec![polygon![
                (x: x0, y: -50.0),
                (x: x1, y: -50.0),
                (x: x1, y: 150.0),
                (x: x0, y: 150.0),
            ]])),
        }
    }

    #[test]
    fn test_two_zones_ambiguous() {
        let zones = vec![zone("B", 80.0, 200.0), zone("A", -100.0, 80.0)];
        let resolution = match_zone(&PlanarEngine::default(), &parcel(), &zones, 99.9);
        let best = resolution.best.unwrap();
        assert_eq!(best.code, "A");
        assert!((best.overlap_percent - 80.0).abs() < 1e-6);
        assert!(resolution.is_ambiguous);
        assert_eq!(resolution.all_matches.len(), 2);
        assert_eq!(resolution.all_matches[1].code, "B");
    }

    #[test]
    fn test_containing_zone_not_ambiguous() {
        let zones = vec![zone("Ж-1", -100.0, 200.0)];
        let resolution = match_zone(&PlanarEngine::default(), &parcel(), &zones, 99.9);
        assert_eq!(resolution.all_matches.len(), 1);
        assert!(!resolution.is_ambiguous);
        assert!((resolution.best.unwrap().overlap_percent - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_near_total_containment_not_ambiguous() {
        // 99.95% in A, a 0.05% sliver in B
        let zones = vec![zone("A", -100.0, 99.95), zone("B", 99.95, 200.0)];
        let resolution = match_zone(&PlanarEngine::default(), &parcel(), &zones, 99.9);
        assert_eq!(resolution.all_matches.len(), 2);
        assert!(!resolution.is_ambiguous);
    }

    #[test]
    fn test_equal_overlap_first_listed_wins() {
        let zones = vec![zone("EAST", 50.0, 200.0), zone("WEST", -100.0, 50.0)];
        let resolution = match_zone(&PlanarEngine::default(), &parcel(), &zones, 99.9);
        assert_eq!(resolution.best.unwrap().code, "EAST");
        assert!(resolution.is_ambiguous);
    }

    #[test]
    fn test_no_match() {
        let zones = vec![zone("FAR", 500.0, 600.0)];
        let resolution = match_zone(&PlanarEngine::default(), &parcel(), &zones, 99.9);
        assert!(resolution.best.is_none());
        assert!(resolution.all_matches.is_empty());
        assert!(!resolution.is_ambiguous);
    }
}
