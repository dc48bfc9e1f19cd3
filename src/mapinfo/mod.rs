//! MapInfo interchange output
//!
//! # Submodules
//! - `charset` - Windows-1251 encoding with substitution
//! - `mif` - MIF/MID layer encoder
//! - `layers` - Layer roles and builders for analysis results
//! - `wor` - Workspace descriptor composer
//! - `convert` - External MIF → TAB conversion

mod charset;
mod mif;
mod layers;
mod wor;
mod convert;

pub use charset::{
    Encoded,
    SUBSTITUTE,
    encode_cp1251,
};

pub use mif::{
    COORDSYS,
    COORDSYS_BOUNDS,
    AttrValue,
    EncodedLayer,
    Feature,
    FeatureGeometry,
    FieldDef,
    FieldType,
    MifEncoder,
    Schema,
    Substitution,
    VectorLayer,
};

pub use layers::{
    LayerRole,
    LayerStyle,
    parcel_layer,
    setback_layer,
    parcel_points_layer,
    capital_objects_layer,
    restriction_layers,
    restriction_labels_layer,
};

pub use wor::{
    LayerRef,
    LegendItem,
    Paper,
    PrintLayout,
    Viewport,
    WorkspaceComposer,
};

pub use convert::{
    LayerConverter,
    Ogr2OgrConverter,
};
