//! Workspace descriptor composition
//!
//! The descriptor opens every produced layer table in generation order, sets
//! up one map window centred on the parcel, styles each layer and, when asked,
//! adds a print layout with a stamp and a restriction legend.

use super::charset::encode_cp1251;
use super::layers::{LayerRole, POINT_NUMBER};
use super::mif::{Substitution, COORDSYS};
use crate::spatial::RestrictionStyle;
use geo::Rect;
use indexmap::IndexSet;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A layer table the descriptor opens
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRef {
    pub role: LayerRole,
    /// Display style of a restriction layer
    pub restriction_style: Option<RestrictionStyle>,
}

impl LayerRef {
    pub fn fixed(role: LayerRole) -> Self {
        Self {
            role,
            restriction_style: None,
        }
    }

    pub fn restriction(position: usize, style: RestrictionStyle) -> Self {
        Self {
            role: LayerRole::Restriction(position),
            restriction_style: Some(style),
        }
    }

    pub fn table(&self) -> String {
        self.role.file_stem()
    }
}

/// Initial map view, in map units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center_x: f64,
    pub center_y: f64,
    pub zoom: f64,
}

impl Viewport {
    /// Centre on `bounds`, zoomed to its larger side times `margin`
    pub fn around(bounds: Rect<f64>, margin: f64) -> Self {
        let center = bounds.center();
        let extent = bounds.width().max(bounds.height()) * margin;
        Self {
            center_x: center.x,
            center_y: center.y,
            zoom: extent.max(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Paper {
    A4,
    #[default]
    A3,
    A2,
}

impl Paper {
    /// Landscape width and height in inches
    fn size(self) -> (f64, f64) {
        match self {
            Paper::A4 => (11.69, 8.27),
            Paper::A3 => (16.54, 11.69),
            Paper::A2 => (23.39, 16.54),
        }
    }
}

/// One legend entry: a style sample and its caption
#[derive(Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub name: String,
    pub registry_number: Option<String>,
    pub style: RestrictionStyle,
}

impl LegendItem {
    pub fn new(name: &str, registry_number: Option<&str>) -> Self {
        Self {
            name: name.trim().to_string(),
            registry_number: registry_number.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            style: RestrictionStyle::for_name(name),
        }
    }

    fn caption(&self) -> String {
        match &self.registry_number {
            Some(reg) => format!("{} ({})", self.name, reg),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrintLayout {
    pub paper: Paper,
    pub title: String,
    pub cadnum: String,
    pub address: Option<String>,
    pub specialist: Option<String>,
    pub date: Option<String>,
    pub area: Option<f64>,
    pub legend: Vec<LegendItem>,
}

impl PrintLayout {
    /// Add legend entries, skipping unnamed ones and repeated (name, registry) pairs
    pub fn with_legend<'a>(mut self, items: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let mut seen: IndexSet<(String, Option<String>)> = self
            .legend
            .iter()
            .map(|i| (i.name.clone(), i.registry_number.clone()))
            .collect();
        for (name, registry) in items {
            let item = LegendItem::new(name, registry);
            if item.name.is_empty() {
                continue;
            }
            if seen.insert((item.name.clone(), item.registry_number.clone())) {
                self.legend.push(item);
            }
        }
        self
    }
}

const ADDRESS_WIDTH: usize = 80;
const FONT: &str = "Font (\"Times New Roman CYR\",2,8,0)";

/// Greedy word wrap by character count
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Quoted descriptor string: doubled quotes, escaped line breaks
fn wor_string(lines: &[String]) -> String {
    let joined = lines.join("\\n").replace('\r', "").replace('"', "\"\"");
    format!("\"{joined}\"")
}

/// Inches with at most four decimals
fn inch(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}

fn create_text(out: &mut String, lines: &[String], x1: f64, y1: f64, x2: f64, y2: f64) {
    out.push_str(&format!(
        "  Create Text\n    {}\n    ({},{}) ({},{})\n    {}\n",
        wor_string(lines),
        inch(x1),
        inch(y1),
        inch(x2),
        inch(y2),
        FONT
    ));
}

pub struct WorkspaceComposer<'a> {
    layers: &'a [LayerRef],
    viewport: Viewport,
    layout: Option<&'a PrintLayout>,
    layer_dir: &'a str,
}

impl<'a> WorkspaceComposer<'a> {
    pub fn new(layers: &'a [LayerRef], viewport: Viewport) -> Self {
        Self {
            layers,
            viewport,
            layout: None,
            layer_dir: "layers",
        }
    }

    pub fn layer_dir(mut self, dir: &'a str) -> Self {
        self.layer_dir = dir;
        self
    }

    pub fn layout(mut self, layout: Option<&'a PrintLayout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn header_section(&self) -> String {
        "!Workspace\n!Version  950\n!Charset WindowsCyrillic\n".to_string()
    }

    /// One open-statement per produced layer, in generation order
    pub fn open_section(&self) -> String {
        self.layers
            .iter()
            .map(|layer| {
                let table = layer.table();
                format!(
                    "Open Table \"{}\\\\{}.TAB\" As {} Interactive\n",
                    self.layer_dir, table, table
                )
            })
            .collect()
    }

    pub fn map_section(&self) -> String {
        if self.layers.is_empty() {
            return String::new();
        }
        let tables: Vec<String> = self.layers.iter().map(LayerRef::table).collect();
        format!(
            "Map From {}\n\
             \x20 Position (0.0520833,0.0520833) Units \"in\"\n\
             \x20 Width 9.91667 Units \"in\" Height 7 Units \"in\"\n\
             Set Window FrontWindow() ScrollBars Off Autoscroll On Enhanced On Smooth Text Antialias Image High\n\
             Set Map\n\
             \x20 {}\n\
             \x20 Center ({:.2},{:.2})\n\
             \x20 Zoom {:.2} Units \"m\"\n\
             \x20 Preserve Zoom Display Zoom\n\
             \x20 Distance Units \"m\" Area Units \"sq m\" XY Units \"m\"\n\
             Dim mapWindowID As Integer\n\
             mapWindowID = FrontWindow()\n",
            tables.join(","),
            COORDSYS,
            self.viewport.center_x,
            self.viewport.center_y,
            self.viewport.zoom
        )
    }

    /// `Set Map Layer n` blocks, numbered like the `Map From` list
    pub fn style_section(&self) -> String {
        let mut out = String::new();
        for (i, layer) in self.layers.iter().enumerate() {
            out.push_str(&format!("Set Map\n  Layer {}\n    Display Global\n", i + 1));
            let body = match layer.role {
                LayerRole::Parcel => "    Global Pen (17,2,16711680) Brush (1,16777215,16777215) Symbol (35,0,12) Line (1,2,0) Font (\"Arial CYR\",0,9,0)\n".to_string(),
                LayerRole::Setback => "    Global Pen (1,2,16711680) Brush (44,16711680) Symbol (35,0,12) Line (1,2,0) Font (\"Arial CYR\",0,9,0)\n".to_string(),
                LayerRole::ParcelPoints => format!(
                    "    Global Pen (1,2,0) Brush (1,16777215,16777215) Symbol (34,16711680,12) Line (1,2,0) Font (\"Arial CYR\",0,9,0)\n\
                     \x20   Label Line None Position Right Font (\"Arial CYR\",256,9,16711680,16777215) Pen (1,2,0)\n\
                     \x20     With {POINT_NUMBER}\n\
                     \x20     Parallel On Auto Off Overlap Off Duplicates On Offset 4\n\
                     \x20     Visibility On\n"
                ),
                LayerRole::CapitalObjects => "    Global Pen (1,2,0) Brush (1,16777215,16777215) Symbol (34,0,17) Line (1,2,0) Font (\"Arial CYR\",0,10,0)\n".to_string(),
                LayerRole::Restriction(_) => {
                    let style = layer
                        .restriction_style
                        .unwrap_or_else(|| RestrictionStyle::for_name(""));
                    format!(
                        "    {} Symbol (35,0,12) Line (1,2,0) Font (\"Arial CYR\",0,9,0)\n",
                        style.global()
                    )
                }
                LayerRole::RestrictionLabels => "    Global Symbol (31,0,0)\n\
                     \x20   Label Line None Position Center Font (\"Arial CYR\",256,10,0,16777215) Pen (1,2,0)\n\
                     \x20     With Реестровый_номер\n\
                     \x20     Parallel On Auto On Overlap Off Duplicates On Offset 2\n\
                     \x20     Visibility On\n"
                    .to_string(),
            };
            out.push_str(&body);
        }
        out
    }

    /// Layout window: map frame, stamp text and legend column
    pub fn layout_section(&self) -> String {
        let Some(layout) = self.layout else {
            return String::new();
        };
        if self.layers.is_empty() {
            return String::new();
        }
        let (width, height) = layout.paper.size();
        let margin = 0.5;
        let legend_width = (width * 0.22).max(2.5);
        let stamp_height = 1.6;
        let frame_right = width - margin - legend_width - 0.1;
        let frame_bottom = height - margin - stamp_height - 0.1;

        let mut out = format!(
            "Layout\n  Position (0.25,0.25) Units \"in\"\n  Width {} Units \"in\" Height {} Units \"in\"\n\
             Set Window FrontWindow() ScrollBars Off Autoscroll On\n\
             Set Layout\n  Ruler On\n  Pagebreaks On\n  Frame Contents On\n",
            inch(width),
            inch(height)
        );
        out.push_str(&format!(
            "  Create Frame ({},{}) ({},{})\n    Pen (1,2,0)\n    Brush (1,16777215,16777215)\n    Title WindowInfo(mapWindowID,1)\n    FillFrame On\n",
            inch(margin),
            inch(margin),
            inch(frame_right),
            inch(frame_bottom)
        ));

        // Stamp below the map frame
        let stamp_top = frame_bottom + 0.1;
        let line_height = 0.2;
        let mut stamp: Vec<Vec<String>> = vec![
            vec![layout.title.clone()],
            vec![format!("Кадастровый номер: {}", layout.cadnum)],
        ];
        let address = layout
            .address
            .clone()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| format!("Земельный участок с кадастровым номером {}", layout.cadnum));
        stamp.push(wrap_words(&address, ADDRESS_WIDTH));
        stamp.push(vec![format!(
            "Площадь: {} кв.м",
            layout.area.map(|a| a.round() as i64).unwrap_or(0)
        )]);
        if let Some(specialist) = layout.specialist.as_deref().filter(|s| !s.is_empty()) {
            stamp.push(vec![format!("Исполнитель: {specialist}")]);
        }
        if let Some(date) = layout.date.as_deref().filter(|d| !d.is_empty()) {
            stamp.push(vec![format!("Дата: {date}")]);
        }
        let mut y = stamp_top;
        for lines in stamp.iter().filter(|l| !l.is_empty()) {
            let block = lines.len() as f64 * line_height;
            create_text(&mut out, lines, margin, y, frame_right, y + block);
            y += block;
        }

        // Legend column right of the frame
        let legend_left = frame_right + 0.1;
        let legend_right = width - margin;
        let sample_width = 0.85;
        let sample_height = 0.14;
        let text_left = legend_left + sample_width + 0.1;
        let text_width = (legend_right - 0.01 - text_left).max(1.0);
        let max_chars = ((text_width * 16.0) as usize).max(18);
        let legend_line = 0.09;
        let gap = 0.2;

        out.push_str(&format!(
            "  Create Rect ({},{}) ({},{})\n    Pen (1,2,0)\n    Brush (1,16777215,16777215)\n",
            inch(legend_left),
            inch(margin),
            inch(legend_right),
            inch(height - margin)
        ));
        let mut y = margin + 0.1;
        create_text(&mut out, &["Условные обозначения".to_string()], text_left, y, text_left + text_width, y + 0.2);
        y += 0.2 + gap;

        for item in &layout.legend {
            let lines = wrap_words(&item.caption(), max_chars);
            let block = (lines.len() as f64 * legend_line).max(sample_height);
            let rect_top = y + (block - sample_height) / 2.0;
            out.push_str(&format!(
                "  Create Rect ({},{}) ({},{})\n    {}\n    {}\n",
                inch(legend_left + 0.1),
                inch(rect_top),
                inch(legend_left + 0.1 + sample_width - 0.1),
                inch(rect_top + sample_height),
                item.style.pen(),
                item.style.brush()
            ));
            create_text(&mut out, &lines, text_left, y, text_left + text_width, y + block);
            y += block + gap;
        }
        debug!("Layout on {:?} with {} legend item(s)", layout.paper, layout.legend.len());
        out
    }

    /// Caller-supplied texts that lose characters to the code page
    pub fn substitutions(&self) -> Vec<Substitution> {
        let mut texts = vec![self.layer_dir.to_string()];
        if let Some(layout) = self.layout.filter(|_| !self.layers.is_empty()) {
            texts.push(layout.title.clone());
            texts.push(layout.cadnum.clone());
            texts.extend(layout.address.clone());
            texts.extend(layout.specialist.clone());
            texts.extend(layout.date.clone());
            texts.extend(layout.legend.iter().map(LegendItem::caption));
        }
        texts
            .into_iter()
            .filter_map(|source_text| {
                let substituted = encode_cp1251(&source_text).substituted;
                (substituted > 0).then(|| {
                    warn!(
                        "Workspace descriptor: replaced {} character(s) in '{}'",
                        substituted, source_text
                    );
                    Substitution {
                        source_text,
                        substituted,
                    }
                })
            })
            .collect()
    }

    /// Whole descriptor, Windows-1251 encoded, with the texts that were altered
    pub fn compose(&self) -> (Vec<u8>, Vec<Substitution>) {
        let mut text = self.header_section();
        text.push_str(&self.open_section());
        text.push_str(&self.map_section());
        text.push_str(&self.style_section());
        if self.layout.is_some() && !self.layers.is_empty() {
            text.push_str("Set Window mapWindowID Front\n");
            text.push_str(&self.layout_section());
        }
        let encoded = encode_cp1251(&text);
        let substitutions = if encoded.substituted > 0 {
            self.substitutions()
        } else {
            Vec::new()
        };
        (encoded.bytes, substitutions)
    }
}
