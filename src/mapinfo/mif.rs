//! MIF/MID vector layer encoding
//!
//! A layer is written as two files: the `.MIF` carries the header, field
//! schema and geometry body, the `.MID` one attribute row per feature in the
//! same column order. Each section is produced by its own method so it can be
//! inspected without touching the disk.

use super::charset::encode_cp1251;
use super::layers::LayerRole;
use crate::error::AnalysisError;
use geo::{LineString, MultiPolygon, Point};
use log::warn;
use std::fmt;

/// Projection shared by every layer and the workspace map window
pub const COORDSYS: &str = "CoordSys Earth Projection 8, 1001, \"m\", 88.46666666666, 0, 1, 2300000, -5512900.5719999997";
pub const COORDSYS_BOUNDS: &str = "Bounds (-7786100, -9553200) (12213900, 10446800)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Char(u16),
    Integer,
    Float,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Char(width) => write!(f, "Char({width})"),
            FieldType::Integer => f.write_str("Integer"),
            FieldType::Float => f.write_str("Float"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

/// Ordered field definitions; attribute rows follow the same order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn char(mut self, name: &str, width: u16) -> Self {
        self.push(name, FieldType::Char(width));
        self
    }

    pub fn integer(mut self, name: &str) -> Self {
        self.push(name, FieldType::Integer);
        self
    }

    pub fn float(mut self, name: &str) -> Self {
        self.push(name, FieldType::Float);
        self
    }

    fn push(&mut self, name: &str, field_type: FieldType) {
        self.fields.push(FieldDef {
            name: name.to_string(),
            field_type,
        });
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One attribute cell; `None` renders as the type's default
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Float(Option<f64>),
}

impl AttrValue {
    pub fn text(value: impl Into<String>) -> Self {
        AttrValue::Text(Some(value.into()))
    }

    fn fits(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (AttrValue::Text(_), FieldType::Char(_))
                | (AttrValue::Integer(_), FieldType::Integer)
                | (AttrValue::Float(_), FieldType::Float)
        )
    }

    fn render(&self) -> String {
        match self {
            AttrValue::Text(value) => quote(value.as_deref().unwrap_or("")),
            AttrValue::Integer(value) => value.unwrap_or(0).to_string(),
            AttrValue::Float(value) => format!("{:.2}", value.unwrap_or(0.0)),
        }
    }
}

/// Double internal quotes, flatten line breaks, wrap in quotes
fn quote(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    format!("\"{}\"", flat.replace('"', "\"\""))
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    Region(MultiPolygon<f64>),
    Point(Point<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: FeatureGeometry,
    pub attributes: Vec<AttrValue>,
}

/// In-memory feature collection, serialized once and dropped
#[derive(Debug, Clone)]
pub struct VectorLayer {
    pub role: LayerRole,
    pub schema: Schema,
    pub features: Vec<Feature>,
}

impl VectorLayer {
    pub fn new(role: LayerRole, schema: Schema) -> Self {
        Self {
            role,
            schema,
            features: Vec::new(),
        }
    }

    pub fn push(&mut self, geometry: FeatureGeometry, attributes: Vec<AttrValue>) {
        self.features.push(Feature { geometry, attributes });
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A text attribute that lost characters to the code page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub source_text: String,
    pub substituted: usize,
}

/// The byte pair for one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLayer {
    pub geometry_file: Vec<u8>,
    pub attribute_file: Vec<u8>,
    pub substitutions: Vec<Substitution>,
}

/// Shortest round-trip decimal; negative zero prints as `0`
fn coord_text(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

fn push_ring(out: &mut String, ring: &LineString<f64>) {
    out.push_str(&format!("  {}\n", ring.0.len()));
    for c in ring.coords() {
        out.push_str(&coord_text(c.x));
        out.push(' ');
        out.push_str(&coord_text(c.y));
        out.push('\n');
    }
}

pub struct MifEncoder<'a> {
    layer: &'a VectorLayer,
}

impl<'a> MifEncoder<'a> {
    pub fn new(layer: &'a VectorLayer) -> Self {
        Self { layer }
    }

    /// Version, charset, delimiter and projection lines
    pub fn header_section(&self) -> Vec<u8> {
        let text = format!(
            "Version   450\nCharset \"WindowsCyrillic\"\nDelimiter \",\"\n{} {}\n",
            COORDSYS, COORDSYS_BOUNDS
        );
        encode_cp1251(&text).bytes
    }

    /// Column declarations followed by the `Data` marker
    pub fn schema_section(&self) -> Vec<u8> {
        let mut text = format!("Columns {}\n", self.layer.schema.len());
        for field in self.layer.schema.fields() {
            text.push_str(&format!("  {} {}\n", field.name, field.field_type));
        }
        text.push_str("Data\n\n");
        encode_cp1251(&text).bytes
    }

    /// One object per feature; regions list every ring of every part
    pub fn geometry_body(&self) -> Vec<u8> {
        let style = self.layer.role.style();
        let mut text = String::new();
        for feature in &self.layer.features {
            match &feature.geometry {
                FeatureGeometry::Region(shape) => {
                    let rings: Vec<&LineString<f64>> = shape
                        .iter()
                        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
                        .collect();
                    text.push_str(&format!("Region  {}\n", rings.len()));
                    for ring in rings {
                        push_ring(&mut text, ring);
                    }
                    text.push_str(&format!("    {}\n", style.pen));
                    text.push_str(&format!("    {}\n", style.brush));
                }
                FeatureGeometry::Point(point) => {
                    text.push_str(&format!(
                        "Point {} {}\n",
                        coord_text(point.x()),
                        coord_text(point.y())
                    ));
                    text.push_str(&format!("    {}\n", style.symbol));
                }
            }
        }
        encode_cp1251(&text).bytes
    }

    /// The `.MID` content and any code-page substitutions it needed
    pub fn attribute_rows(&self) -> (Vec<u8>, Vec<Substitution>) {
        let mut bytes = Vec::new();
        let mut substitutions = Vec::new();
        for feature in &self.layer.features {
            let row: Vec<String> = feature.attributes.iter().map(AttrValue::render).collect();
            let line = format!("{}\n", row.join(","));
            let encoded = encode_cp1251(&line);
            if encoded.substituted > 0 {
                for value in &feature.attributes {
                    if let AttrValue::Text(Some(source)) = value {
                        let count = encode_cp1251(source).substituted;
                        if count > 0 {
                            warn!(
                                "{}: replaced {} character(s) in '{}'",
                                self.layer.role.file_stem(),
                                count,
                                source
                            );
                            substitutions.push(Substitution {
                                source_text: source.clone(),
                                substituted: count,
                            });
                        }
                    }
                }
            }
            bytes.extend(encoded.bytes);
        }
        (bytes, substitutions)
    }

    /// Every row must match the schema in length and field types
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let layer = self.layer.role.file_stem();
        let fields = self.layer.schema.fields();
        for (row, feature) in self.layer.features.iter().enumerate() {
            if feature.attributes.len() != fields.len() {
                return Err(AnalysisError::SchemaMismatch {
                    layer,
                    row,
                    expected: fields.len(),
                    found: feature.attributes.len(),
                });
            }
            for (value, field) in feature.attributes.iter().zip(fields) {
                if !value.fits(field.field_type) {
                    return Err(AnalysisError::FieldTypeMismatch {
                        layer,
                        row,
                        field: field.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate, then compose both files from their sections
    pub fn encode(&self) -> Result<EncodedLayer, AnalysisError> {
        self.validate()?;
        let mut geometry_file = self.header_section();
        geometry_file.extend(self.schema_section());
        geometry_file.extend(self.geometry_body());
        let (attribute_file, substitutions) = self.attribute_rows();
        Ok(EncodedLayer {
            geometry_file,
            attribute_file,
            substitutions,
        })
    }
}
