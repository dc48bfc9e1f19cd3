//! Layer assembly from analysis results
//!
//! Each semantic role has a fixed file stem, schema and drawing style, so the
//! descriptor can reference layers by role alone.

use super::mif::{AttrValue, FeatureGeometry, Schema, VectorLayer};
use crate::spatial::{
    describe_restriction, CapitalObject, Contour, ObjectGeometry, ParcelGeometry,
    RestrictionZone, Setback,
};
use geo::{MultiPolygon, Point};
use indexmap::IndexSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerRole {
    Parcel,
    Setback,
    ParcelPoints,
    CapitalObjects,
    /// 1-based position in the restriction list
    Restriction(usize),
    RestrictionLabels,
}

/// Fixed per-role drawing parameters written into the geometry file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerStyle {
    pub pen: &'static str,
    pub brush: &'static str,
    pub symbol: &'static str,
}

impl LayerRole {
    pub fn file_stem(&self) -> String {
        match self {
            LayerRole::Parcel => "parcel".to_string(),
            LayerRole::Setback => "setback".to_string(),
            LayerRole::ParcelPoints => "parcel_points".to_string(),
            LayerRole::CapitalObjects => "capital_objects".to_string(),
            LayerRole::Restriction(n) => format!("restriction_{n}"),
            LayerRole::RestrictionLabels => "restriction_labels".to_string(),
        }
    }

    pub fn style(&self) -> LayerStyle {
        let (brush, symbol) = match self {
            LayerRole::Parcel => ("Brush (1,0,16777215)", "Symbol (35,0,12)"),
            LayerRole::Setback => ("Brush (2,0,16777215)", "Symbol (35,0,12)"),
            LayerRole::ParcelPoints => ("Brush (1,0,16777215)", "Symbol (34,6,12)"),
            LayerRole::CapitalObjects => ("Brush (1,0,16777215)", "Symbol (35,12,0)"),
            LayerRole::Restriction(_) => ("Brush (2,16776960,16777215)", "Symbol (35,0,12)"),
            LayerRole::RestrictionLabels => ("Brush (1,0,16777215)", "Symbol (31,0,0)"),
        };
        LayerStyle {
            pen: "Pen (1,2,0)",
            brush,
            symbol,
        }
    }
}

const CADNUM: &str = "Кадастровый_номер";
const AREA: &str = "Площадь";
const REGISTRY_NUMBER: &str = "Реестровый_номер";
pub const POINT_NUMBER: &str = "Номер_точки";
const SETBACK_DESCRIPTION: &str = "Минимальные отступы от границ ЗУ";

pub fn parcel_layer(
    cadnum: &str,
    address: Option<&str>,
    area: Option<f64>,
    parcel: &ParcelGeometry,
) -> VectorLayer {
    let schema = Schema::new().char(CADNUM, 254).char("Адрес", 254).float(AREA);
    let mut layer = VectorLayer::new(LayerRole::Parcel, schema);
    layer.push(
        FeatureGeometry::Region(parcel.shape.clone()),
        vec![
            AttrValue::text(cadnum),
            AttrValue::Text(address.map(str::to_string)),
            AttrValue::Float(area),
        ],
    );
    layer
}

/// `None` when the offset left nothing to draw
pub fn setback_layer(cadnum: &str, setback: &Setback) -> Option<VectorLayer> {
    let polygon = setback.polygon()?;
    let schema = Schema::new().char(CADNUM, 254).char("Описание", 254).float(AREA);
    let mut layer = VectorLayer::new(LayerRole::Setback, schema);
    layer.push(
        FeatureGeometry::Region(MultiPolygon::new(vec![polygon.clone()])),
        vec![
            AttrValue::text(cadnum),
            AttrValue::text(SETBACK_DESCRIPTION),
            AttrValue::Float(Some(setback.area())),
        ],
    );
    Some(layer)
}

/// One point per distinct label, first occurrence in contour order
pub fn parcel_points_layer(cadnum: &str, contours: &[Contour]) -> VectorLayer {
    let schema = Schema::new().char(POINT_NUMBER, 40).char(CADNUM, 254);
    let mut layer = VectorLayer::new(LayerRole::ParcelPoints, schema);
    let mut seen = IndexSet::new();
    for coord in contours.iter().flatten() {
        if !seen.insert(coord.num.as_str()) {
            continue;
        }
        layer.push(
            FeatureGeometry::Point(Point::from(coord.location)),
            vec![AttrValue::text(coord.num.as_str()), AttrValue::text(cadnum)],
        );
    }
    layer
}

pub fn capital_objects_layer(objects: &[CapitalObject]) -> Option<VectorLayer> {
    if objects.is_empty() {
        return None;
    }
    let schema = Schema::new()
        .integer("Номер")
        .char(CADNUM, 254)
        .char("Тип_объекта", 254)
        .char("Назначение", 254)
        .float(AREA)
        .integer("Этажность");
    let mut layer = VectorLayer::new(LayerRole::CapitalObjects, schema);
    for (i, object) in objects.iter().enumerate() {
        let geometry = match &object.geometry {
            ObjectGeometry::Point(point) => FeatureGeometry::Point(*point),
            ObjectGeometry::Region(shape) => FeatureGeometry::Region(shape.clone()),
        };
        layer.push(
            geometry,
            vec![
                AttrValue::Integer(Some(i as i64 + 1)),
                AttrValue::Text(object.cadnum.clone()),
                AttrValue::Text(object.object_type.clone()),
                AttrValue::Text(object.purpose.clone()),
                AttrValue::Float(object.area),
                AttrValue::Integer(object.floors),
            ],
        );
    }
    Some(layer)
}

fn restriction_schema() -> Schema {
    Schema::new()
        .char("Наименование", 254)
        .char("Тип", 254)
        .char(REGISTRY_NUMBER, 254)
        .char("Ограничения", 254)
        .float(AREA)
}

/// One layer per restriction so each can carry its own display style
pub fn restriction_layers(zones: &[RestrictionZone]) -> Vec<VectorLayer> {
    zones
        .iter()
        .enumerate()
        .map(|(i, zone)| {
            let mut layer = VectorLayer::new(LayerRole::Restriction(i + 1), restriction_schema());
            layer.push(
                FeatureGeometry::Region(zone.intersection_geometry.clone()),
                vec![
                    AttrValue::Text(zone.name.clone()),
                    AttrValue::text(zone.zone_type.as_str()),
                    AttrValue::Text(zone.registry_number.clone()),
                    AttrValue::text(describe_restriction(zone)),
                    AttrValue::Float(Some(zone.intersection_area)),
                ],
            );
            layer
        })
        .collect()
}

/// Label anchors for restrictions; `None` when no restriction has one
pub fn restriction_labels_layer(zones: &[RestrictionZone]) -> Option<VectorLayer> {
    let schema = Schema::new().char(REGISTRY_NUMBER, 254);
    let mut layer = VectorLayer::new(LayerRole::RestrictionLabels, schema);
    for zone in zones {
        if let Some(point) = zone.label_point {
            layer.push(
                FeatureGeometry::Point(point),
                vec![AttrValue::Text(zone.registry_number.clone())],
            );
        }
    }
    (!layer.is_empty()).then_some(layer)
}
