//! Spatial resolution for cadastral parcels
//!
//! # Submodules
//! - `types` - Registry points, parcel/setback geometry and candidate layers
//! - `coords` - Coordinate normalization and renumbering
//! - `engine` - Planar geometry engine handle
//! - `builder` - Parcel assembly, repair and setback offset
//! - `overlap` - Overlap ranking shared by zone and restriction matching
//! - `zones` - Territorial zone matching
//! - `restrictions` - Restriction intersection and capital object lookup
//! - `classify` - Restriction categories and display styles

mod types;
mod coords;
mod engine;
mod builder;
mod overlap;
mod zones;
mod restrictions;
mod classify;

pub use types::{
    AxisOrder,
    RawCoord,
    RawContour,
    Coord,
    Contour,
    ParcelGeometry,
    Setback,
    CandidateZone,
    OverlapMatch,
    ZoneResolution,
    RestrictionCandidate,
    RestrictionZone,
    ObjectGeometry,
    CapitalObjectCandidate,
    CapitalObject,
};

pub use coords::{
    NormalizedContours,
    normalize,
    normalize_decimal,
    parse_decimal,
};

pub use engine::{
    EngineConfig,
    PlanarEngine,
};

pub use builder::{
    build_parcel,
    build_setback,
};

pub use overlap::{
    Footprint,
    Overlap,
    resolve,
};

pub use zones::match_zone;

pub use restrictions::{
    intersect_restrictions,
    find_capital_objects,
    describe_restriction,
};

pub use classify::{
    RestrictionCategory,
    RestrictionStyle,
    classify,
    rgb,
};
