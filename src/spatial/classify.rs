//! Restriction classification and display styles
//!
//! Restriction names are free text, so the category is found by keyword rules
//! evaluated in a fixed priority order; the first matching rule wins. Each
//! category maps to a pen/brush pair, with the brush density taken from the
//! name where the category has graded sub-kinds (aerodrome subzones, flood
//! intensity, sanitary belts).

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionCategory {
    CulturalHeritage,
    Geodetic,
    PublicEasement,
    /// Sanitary protection belts of water intakes
    WaterIntakeSanitary,
    Aerodrome,
    Flooding,
    WaterProtection,
    Gas,
    Heating,
    Communications,
    Electric,
    SanitaryProtection,
    Mining,
    Other,
}

/// A keyword rule; `requires`/`excludes` refine the keyword hit
struct Rule {
    category: RestrictionCategory,
    keywords: &'static [&'static str],
    requires: Option<&'static str>,
    excludes: Option<&'static str>,
}

impl Rule {
    const fn any(category: RestrictionCategory, keywords: &'static [&'static str]) -> Self {
        Self {
            category,
            keywords,
            requires: None,
            excludes: None,
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
            && self.requires.map_or(true, |r| lowered.contains(r))
            && self.excludes.map_or(true, |e| !lowered.contains(e))
    }
}

/// Priority order matters: categories share keywords
static RULES: &[Rule] = &[
    Rule::any(
        RestrictionCategory::CulturalHeritage,
        &["культурного наслед", "окн", "памятник", "объект культурного"],
    ),
    Rule::any(
        RestrictionCategory::Geodetic,
        &["геодез", "нивели", "ггс", "пункт государственной", "триангуляц", "репер"],
    ),
    Rule::any(
        RestrictionCategory::PublicEasement,
        &["публичный сервитут", "публичного сервитута", "сервитут"],
    ),
    Rule {
        category: RestrictionCategory::WaterIntakeSanitary,
        keywords: &[
            "зона санитарной охраны",
            "зоны санитарной охраны",
            "зсо",
            "водозабор",
            "водозаборн",
            "скважин",
        ],
        requires: Some("пояс"),
        excludes: None,
    },
    Rule::any(RestrictionCategory::Aerodrome, &["приаэродром", "аэродром"]),
    Rule::any(RestrictionCategory::Flooding, &["подтоплен", "затоплен"]),
    Rule::any(
        RestrictionCategory::WaterProtection,
        &["водоохран", "прибрежн", "берегов"],
    ),
    Rule::any(
        RestrictionCategory::Gas,
        &["газопровод", "газораспредел", "грс", "газ "],
    ),
    Rule::any(
        RestrictionCategory::Heating,
        &["теплотрасс", "теплосет", "теплопровод", "паротрасс", "тэц", "котельн"],
    ),
    Rule::any(
        RestrictionCategory::Communications,
        &["волс", "связ", "оптическ", "кабель связ"],
    ),
    Rule::any(
        RestrictionCategory::Electric,
        &["лэп", "вл ", "вл-", "кл ", "кл-", "квл", "пс", "подстанц", "электро", "кв"],
    ),
    Rule {
        category: RestrictionCategory::SanitaryProtection,
        keywords: &["сзз", "санитарно-защит", "санитарно защит", "санитарн"],
        requires: None,
        excludes: Some("охраны"),
    },
    Rule::any(
        RestrictionCategory::Mining,
        &["шахт", "разрез", "карьер", "уголь", "горн"],
    ),
];

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static AERODROME_SUBZONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:подзона|подзоны|зона)\s*([1-7])").expect("valid regex"));
static FLOOD_INTENSITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(сильн(?:ого|ая|ое)|умерен(?:ного|ая|ое)|слаб(?:ого|ая|ое))")
        .expect("valid regex")
});
static SANITARY_BELT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(перв(?:ый|ого)\s+пояс|втор(?:ой|ого)\s+пояс|трет(?:ий|ьего)\s+пояс|\b[1-3]\s*пояс)")
        .expect("valid regex")
});

/// Collapse runs of whitespace and trim
fn normalize_name(name: &str) -> String {
    WHITESPACE.replace_all(name.trim(), " ").into_owned()
}

/// Classify a restriction by its name
pub fn classify(name: &str) -> RestrictionCategory {
    let lowered = normalize_name(name).to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.category)
        .unwrap_or(RestrictionCategory::Other)
}

/// Brush fill families; each has five densities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    Hatch,
    Cross,
    Dots,
}

impl Fill {
    fn pattern(self, density: u8) -> u16 {
        let base = match self {
            Fill::Hatch => 44,
            Fill::Cross => 49,
            Fill::Dots => 54,
        };
        base + u16::from(density.clamp(1, 5)) - 1
    }
}

/// Packed `0xRRGGBB` color
pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) + ((g as u32) << 8) + b as u32
}

const GREEN: (u32, u32) = (rgb(0, 150, 0), rgb(120, 210, 120));
const GRAY: (u32, u32) = (rgb(120, 120, 120), rgb(205, 205, 205));
const BLUE: (u32, u32) = (rgb(0, 140, 255), rgb(150, 210, 255));
const YELLOW: (u32, u32) = (rgb(240, 190, 0), rgb(255, 235, 140));
const PINK: (u32, u32) = (rgb(220, 70, 150), rgb(255, 190, 225));
const PURPLE: (u32, u32) = (rgb(140, 90, 200), rgb(220, 205, 245));
const ORANGE: (u32, u32) = (rgb(230, 120, 0), rgb(255, 210, 150));
const BROWN: (u32, u32) = (rgb(140, 85, 40), rgb(235, 205, 175));
const TEAL: (u32, u32) = (rgb(0, 150, 170), rgb(160, 235, 245));

fn aerodrome_density(name: &str) -> u8 {
    let subzone = AERODROME_SUBZONE
        .captures(name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u8>().ok());
    match subzone {
        Some(7) | Some(5) => 4,
        Some(6) => 5,
        Some(4) => 3,
        Some(3) | Some(2) => 2,
        _ => 1,
    }
}

fn flood_density(name: &str) -> u8 {
    let Some(found) = FLOOD_INTENSITY.find(name) else {
        return 2;
    };
    let found = found.as_str().to_lowercase();
    if found.contains("сильн") {
        5
    } else if found.contains("умерен") {
        3
    } else if found.contains("слаб") {
        1
    } else {
        2
    }
}

fn water_protection_density(lowered: &str) -> u8 {
    if lowered.contains("берегов") {
        5
    } else if lowered.contains("прибрежн") {
        3
    } else {
        2
    }
}

fn sanitary_belt_density(name: &str) -> u8 {
    let Some(found) = SANITARY_BELT.find(name) else {
        return 3;
    };
    let found = found.as_str().to_lowercase();
    if found.contains("перв") || found.contains('1') {
        5
    } else if found.contains("втор") || found.contains('2') {
        3
    } else if found.contains("трет") || found.contains('3') {
        2
    } else {
        3
    }
}

/// Pen and brush used to draw a restriction layer and its legend sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestrictionStyle {
    pub pen_width: u8,
    pub pen_pattern: u8,
    pub pen_color: u32,
    pub brush_pattern: u16,
    pub brush_color: u32,
}

impl RestrictionStyle {
    /// Classify `name` and derive its style
    pub fn for_name(name: &str) -> Self {
        let normalized = normalize_name(name);
        let lowered = normalized.to_lowercase();
        let category = classify(&normalized);

        let (palette, fill, density, pen_pattern) = match category {
            RestrictionCategory::CulturalHeritage => (PINK, Fill::Hatch, 3, 1),
            RestrictionCategory::Geodetic => (BROWN, Fill::Dots, 2, 1),
            RestrictionCategory::PublicEasement => (PURPLE, Fill::Hatch, 2, 2),
            RestrictionCategory::WaterIntakeSanitary => {
                (TEAL, Fill::Hatch, sanitary_belt_density(&normalized), 1)
            }
            RestrictionCategory::Aerodrome => (GRAY, Fill::Dots, aerodrome_density(&normalized), 1),
            RestrictionCategory::Flooding => (BLUE, Fill::Dots, flood_density(&normalized), 1),
            RestrictionCategory::WaterProtection => {
                (BLUE, Fill::Hatch, water_protection_density(&lowered), 1)
            }
            RestrictionCategory::Gas => (BLUE, Fill::Cross, 3, 1),
            RestrictionCategory::Heating => (ORANGE, Fill::Cross, 2, 1),
            RestrictionCategory::Communications => (YELLOW, Fill::Hatch, 3, 1),
            RestrictionCategory::Electric => (GREEN, Fill::Hatch, 3, 1),
            RestrictionCategory::SanitaryProtection => (GRAY, Fill::Hatch, 2, 1),
            RestrictionCategory::Mining => (BROWN, Fill::Hatch, 3, 1),
            RestrictionCategory::Other => {
                return Self {
                    pen_width: 1,
                    pen_pattern: 1,
                    pen_color: rgb(0, 0, 0),
                    brush_pattern: Fill::Hatch.pattern(1),
                    brush_color: rgb(245, 245, 245),
                };
            }
        };

        Self {
            pen_width: 2,
            pen_pattern,
            pen_color: palette.0,
            brush_pattern: fill.pattern(density),
            brush_color: palette.1,
        }
    }

    pub fn pen(&self) -> String {
        format!("Pen ({},{},{})", self.pen_pattern, self.pen_width, self.pen_color)
    }

    pub fn brush(&self) -> String {
        format!("Brush ({},{})", self.brush_pattern, self.brush_color)
    }

    /// Layer-wide display clause
    pub fn global(&self) -> String {
        format!("Global {} {}", self.pen(), self.brush())
    }
}
