//! Coordinate normalization and point renumbering
//!
//! Registry extracts carry decimal commas, stray whitespace and point labels
//! that repeat between contours. Normalization unifies the decimal text,
//! fixes the axis convention once, and issues fresh point numbers from a
//! single counter shared by all contours of a parcel.

use super::types::{AxisOrder, Contour, Coord, RawContour};
use crate::error::Warning;
use indexmap::IndexMap;
use log::warn;

/// Result of normalizing a parcel's contours
#[derive(Debug, Clone, Default)]
pub struct NormalizedContours {
    pub contours: Vec<Contour>,
    /// Points dropped because their coordinates did not parse
    pub dropped: usize,
    pub warnings: Vec<Warning>,
}

/// Unify decimal separator and strip all whitespace
pub fn normalize_decimal(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

/// Parse already-normalized decimal text, rejecting NaN and infinities
pub fn parse_decimal(normalized: &str) -> Option<f64> {
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalize and renumber contours.
///
/// Within one contour, points with identical normalized `(north, east)` text
/// share the label issued at their first occurrence. A pair recurring in a
/// later contour gets a new label; the counter never restarts.
pub fn normalize(contours: &[RawContour], axis: AxisOrder) -> NormalizedContours {
    let mut result = NormalizedContours::default();
    let mut last_issued = 0u32;

    for (contour_idx, raw_contour) in contours.iter().enumerate() {
        let mut labels: IndexMap<(String, String), u32> = IndexMap::new();
        let mut contour = Contour::with_capacity(raw_contour.len());

        for (position, raw) in raw_contour.iter().enumerate() {
            let (raw_north, raw_east) = match axis {
                AxisOrder::NorthEast => (&raw.x, &raw.y),
                AxisOrder::EastNorth => (&raw.y, &raw.x),
            };
            let north = normalize_decimal(raw_north);
            let east = normalize_decimal(raw_east);

            let (Some(n), Some(e)) = (parse_decimal(&north), parse_decimal(&east)) else {
                warn!(
                    "Dropping malformed coordinate in contour {} at position {}: ({}, {})",
                    contour_idx, position, raw_north, raw_east
                );
                result.dropped += 1;
                result.warnings.push(Warning::MalformedCoordinate {
                    contour: contour_idx,
                    position,
                    north: raw_north.clone(),
                    east: raw_east.clone(),
                });
                continue;
            };

            let label = *labels
                .entry((north.clone(), east.clone()))
                .or_insert_with(|| {
                    last_issued += 1;
                    last_issued
                });

            contour.push(Coord {
                num: label.to_string(),
                north,
                east,
                location: geo::Coord { x: e, y: n },
            });
        }

        result.contours.push(contour);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::RawCoord;

    fn raw(x: &str, y: &str) -> RawCoord {
        RawCoord::new("", x, y)
    }

    fn labels(contour: &Contour) -> Vec<&str> {
        contour.iter().map(|c| c.num.as_str()).collect()
    }

    #[test]
    fn test_normalize_decimal() {
        assert_eq!(normalize_decimal(" 447 000,15 "), "447000.15");
        assert_eq!(normalize_decimal("2209100.5"), "2209100.5");
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("12.5"), Some(12.5));
    }

    #[test]
    fn test_repeated_point_in_same_contour_reuses_label() {
        let contours = vec![vec![
            raw("0", "0"),
            raw("0", "100"),
            raw("100,0", "100"),
            raw("0.0", "0"),
            raw(" 0 ", "0"),
        ]];
        let result = normalize(&contours, AxisOrder::NorthEast);
        // "0.0" is a different text than "0", so it is a new point
        assert_eq!(labels(&result.contours[0]), vec!["1", "2", "3", "4", "1"]);
        assert_eq!(result.dropped, 0);
    }

    #[test]
    fn test_numbering_continues_across_contours_without_dedup() {
        let contours = vec![
            vec![raw("0", "0"), raw("0", "10"), raw("10", "10"), raw("0", "0")],
            vec![raw("0", "0"), raw("5", "5"), raw("0", "0")],
        ];
        let result = normalize(&contours, AxisOrder::NorthEast);
        assert_eq!(labels(&result.contours[0]), vec!["1", "2", "3", "1"]);
        // same pair as contour 1 point 1, but a fresh and greater label
        assert_eq!(labels(&result.contours[1]), vec!["4", "5", "4"]);
    }

    #[test]
    fn test_axis_order_is_applied() {
        let contours = vec![vec![raw("2209000,5", "447000")]];
        let north_east = normalize(&contours, AxisOrder::NorthEast);
        let point = &north_east.contours[0][0];
        assert_eq!(point.north, "2209000.5");
        assert_eq!(point.east, "447000");
        assert_eq!(point.location, geo::Coord { x: 447000.0, y: 2209000.5 });

        let east_north = normalize(&contours, AxisOrder::EastNorth);
        let point = &east_north.contours[0][0];
        assert_eq!(point.north, "447000");
        assert_eq!(point.east, "2209000.5");
    }

    #[test]
    fn test_malformed_points_are_dropped_and_counted() {
        let contours = vec![vec![
            raw("0", "0"),
            raw("abc", "1"),
            raw("1", ""),
            raw("1", "1"),
        ]];
        let result = normalize(&contours, AxisOrder::NorthEast);
        assert_eq!(result.dropped, 2);
        assert_eq!(result.warnings.len(), 2);
        assert_eq!(labels(&result.contours[0]), vec!["1", "2"]);
        assert!(matches!(
            result.warnings[0],
            Warning::MalformedCoordinate { contour: 0, position: 1, .. }
        ));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let contours = vec![vec![raw("1,5", "2"), raw("3", "4")], vec![raw("1,5", "2")]];
        let a = normalize(&contours, AxisOrder::NorthEast);
        let b = normalize(&contours, AxisOrder::NorthEast);
        assert_eq!(a.contours, b.contours);
    }
}
