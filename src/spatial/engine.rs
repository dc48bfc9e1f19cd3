//! Planar geometry engine handle
//!
//! Thin wrapper over the `geo` algorithms used by the builder and the overlap
//! resolver. Precision settings travel with the handle instead of living in
//! global state, so concurrent runs may use different engines.

use geo::algorithm::buffer::{BufferStyle, LineCap, LineJoin};
use geo::{
    Area, BooleanOps, BoundingRect, Buffer, Centroid, InteriorPoint, Intersects, MapCoords,
    MultiPolygon, Point, Polygon, Rect, Validation,
};
use serde::{Deserialize, Serialize};

/// Engine settings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Snap every derived vertex to this grid (planar units)
    pub snap_grid: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct PlanarEngine {
    config: EngineConfig,
}

impl PlanarEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn area(&self, shape: &MultiPolygon<f64>) -> f64 {
        shape.unsigned_area()
    }

    pub fn polygon_area(&self, polygon: &Polygon<f64>) -> f64 {
        polygon.unsigned_area()
    }

    pub fn intersects(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> bool {
        a.intersects(b)
    }

    pub fn contains_point(&self, shape: &MultiPolygon<f64>, point: &Point<f64>) -> bool {
        shape.intersects(point)
    }

    pub fn intersection(&self, a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        self.snap(a.intersection(b))
    }

    pub fn is_valid(&self, shape: &MultiPolygon<f64>) -> bool {
        shape.is_valid()
    }

    /// Rebuild a valid region from possibly overlapping or self-intersecting
    /// rings. Rings are folded with symmetric difference, so a ring nested in
    /// another becomes a hole (even-odd fill).
    pub fn repair(&self, shape: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let mut acc = MultiPolygon::new(vec![]);
        for polygon in shape {
            let ring = MultiPolygon::new(vec![polygon.clone()]);
            acc = acc.xor(&ring);
        }
        self.snap(acc)
    }

    /// Offset with mitred joins and square caps; negative distance shrinks.
    ///
    /// `miter_limit` is the mitre length to offset distance ratio. Corners
    /// sharper than the matching angle are bevelled.
    pub fn offset(&self, shape: &MultiPolygon<f64>, distance: f64, miter_limit: f64) -> MultiPolygon<f64> {
        let style = BufferStyle::new(distance)
            .line_join(LineJoin::Miter(miter_angle(miter_limit)))
            .line_cap(LineCap::Square);
        self.snap(shape.buffer_with_style(style))
    }

    /// A point guaranteed to lie inside the polygon
    pub fn interior_point(&self, polygon: &Polygon<f64>) -> Option<Point<f64>> {
        polygon.interior_point()
    }

    pub fn centroid(&self, polygon: &Polygon<f64>) -> Option<Point<f64>> {
        polygon.centroid()
    }

    pub fn bounds(&self, shape: &MultiPolygon<f64>) -> Option<Rect<f64>> {
        shape.bounding_rect()
    }

    fn snap(&self, shape: MultiPolygon<f64>) -> MultiPolygon<f64> {
        match self.config.snap_grid {
            Some(grid) if grid > 0.0 => shape.map_coords(|c| geo::Coord {
                x: (c.x / grid).round() * grid,
                y: (c.y / grid).round() * grid,
            }),
            _ => shape,
        }
    }
}

/// Smallest corner angle (radians) that still gets a full mitre for a
/// length ratio; the buffer backend takes the angle, not the ratio.
fn miter_angle(miter_limit: f64) -> f64 {
    2.0 * (1.0 / miter_limit.max(1.0)).asin()
}
