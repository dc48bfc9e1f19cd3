//! Core data types for parcel analysis
//!
//! Raw registry points, normalized contours, the derived parcel/setback
//! geometries, and the externally supplied candidate layers.

use geo::{MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

/// How a raw `(x, y)` pair maps onto the north/east axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisOrder {
    /// `x` is northing, `y` is easting (registry convention)
    #[default]
    NorthEast,
    /// `x` is easting, `y` is northing
    EastNorth,
}

/// A boundary point as supplied by the registry extract parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCoord {
    #[serde(default)]
    pub num: String,
    pub x: String,
    pub y: String,
}

impl RawCoord {
    pub fn new(num: impl Into<String>, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            num: num.into(),
            x: x.into(),
            y: y.into(),
        }
    }
}

pub type RawContour = Vec<RawCoord>;

/// A normalized, renumbered boundary point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coord {
    pub num: String,
    /// Normalized decimal text (point separator, no whitespace)
    pub north: String,
    pub east: String,
    /// Planar position, `x` = east, `y` = north
    #[serde(skip)]
    pub location: geo::Coord<f64>,
}

pub type Contour = Vec<Coord>;

/// The parcel outline built from all contours
#[derive(Debug, Clone)]
pub struct ParcelGeometry {
    pub shape: MultiPolygon<f64>,
    pub area: f64,
}

/// Inward-offset building zone
#[derive(Debug, Clone)]
pub enum Setback {
    Region { polygon: Polygon<f64>, area: f64 },
    /// The offset consumed the whole parcel
    Empty,
}

impl Setback {
    pub fn polygon(&self) -> Option<&Polygon<f64>> {
        match self {
            Setback::Region { polygon, .. } => Some(polygon),
            Setback::Empty => None,
        }
    }

    pub fn area(&self) -> f64 {
        match self {
            Setback::Region { area, .. } => *area,
            Setback::Empty => 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Setback::Empty)
    }
}

/// Territorial/administrative zone from an external layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateZone {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub geometry: Option<MultiPolygon<f64>>,
}

/// Overlap of one candidate with the parcel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlapMatch {
    pub code: String,
    pub name: String,
    pub overlap_area: f64,
    pub overlap_percent: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ZoneResolution {
    pub best: Option<OverlapMatch>,
    /// Descending by overlap percent
    pub all_matches: Vec<OverlapMatch>,
    pub is_ambiguous: bool,
}

/// Restriction zone (protection/sanitary/easement area) from an external layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestrictionCandidate {
    #[serde(default)]
    pub zone_type: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub registry_number: Option<String>,
    #[serde(default)]
    pub decision_number: Option<String>,
    #[serde(default)]
    pub decision_date: Option<String>,
    #[serde(default)]
    pub decision_authority: Option<String>,
    #[serde(default)]
    pub geometry: Option<MultiPolygon<f64>>,
}

/// Restriction intersecting the parcel
#[derive(Debug, Clone, Serialize)]
pub struct RestrictionZone {
    pub zone_type: String,
    pub name: Option<String>,
    pub registry_number: Option<String>,
    pub decision_number: Option<String>,
    pub decision_date: Option<String>,
    pub decision_authority: Option<String>,
    pub category: super::RestrictionCategory,
    /// Every part of the restriction that lies inside the parcel
    #[serde(skip)]
    pub intersection_geometry: MultiPolygon<f64>,
    pub intersection_area: f64,
    /// Anchor inside the largest intersecting part
    #[serde(skip)]
    pub label_point: Option<Point<f64>>,
}

/// Geometry of a capital construction object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ObjectGeometry {
    Point(Point<f64>),
    Region(MultiPolygon<f64>),
}

/// Capital construction object (building, structure) from an external layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapitalObjectCandidate {
    #[serde(default)]
    pub cadnum: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub floors: Option<i64>,
    #[serde(default)]
    pub geometry: Option<ObjectGeometry>,
}

/// Capital object located on the parcel
#[derive(Debug, Clone)]
pub struct CapitalObject {
    pub cadnum: Option<String>,
    pub object_type: Option<String>,
    pub purpose: Option<String>,
    pub area: Option<f64>,
    pub floors: Option<i64>,
    pub geometry: ObjectGeometry,
}
