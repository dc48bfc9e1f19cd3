//! Error taxonomy and recoverable warnings for a parcel analysis run
//!
//! Fatal conditions are `AnalysisError`s wrapped in a `ParcelFailure` that
//! names the parcel and the stage. Recoverable conditions never abort a run;
//! they are collected as `Warning`s next to the successful result.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Pipeline stage a failure or warning originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BuildParcel,
    BuildSetback,
    Encode,
    Write,
    Convert,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::BuildParcel => "parcel construction",
            Stage::BuildSetback => "setback construction",
            Stage::Encode => "layer encoding",
            Stage::Write => "file writing",
            Stage::Convert => "format conversion",
        };
        f.write_str(name)
    }
}

/// Fatal errors for a single parcel
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("at least 3 distinct points are required to build a parcel, got {distinct_points}")]
    InsufficientGeometry { distinct_points: usize },

    #[error("geometry repair failed: {reason}")]
    GeometryRepairFailed { reason: String },

    #[error("layer '{layer}' row {row}: expected {expected} attribute(s), found {found}")]
    SchemaMismatch {
        layer: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("layer '{layer}' row {row}: value for field '{field}' does not match its declared type")]
    FieldTypeMismatch {
        layer: String,
        row: usize,
        field: String,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("conversion of {} failed: {reason}", path.display())]
    Conversion { path: PathBuf, reason: String },
}

/// A fatal error together with the parcel and stage it aborted
#[derive(Debug, thiserror::Error)]
#[error("parcel {cadnum}: {stage} failed: {source}")]
pub struct ParcelFailure {
    pub cadnum: String,
    pub stage: Stage,
    #[source]
    pub source: AnalysisError,
}

impl ParcelFailure {
    pub fn new(cadnum: impl Into<String>, stage: Stage, source: AnalysisError) -> Self {
        Self {
            cadnum: cadnum.into(),
            stage,
            source,
        }
    }
}

/// Recoverable conditions reported alongside a successful result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A point whose coordinates are not decimal numbers; the point was dropped
    MalformedCoordinate {
        contour: usize,
        position: usize,
        north: String,
        east: String,
    },
    /// A contour with fewer than 3 distinct points, left out of the parcel
    ContourTooShort { contour: usize, distinct_points: usize },
    /// A multi-part result was reduced to its largest part
    PartsDiscarded {
        stage: Stage,
        kept_area: f64,
        discarded: usize,
    },
    /// The inward offset left no buildable interior
    EmptySetback { distance: f64 },
    NoZoneMatch,
    AmbiguousZone {
        best_code: String,
        best_percent: f64,
        candidates: usize,
    },
    RestrictionWithoutGeometry { index: usize, name: Option<String> },
    /// Characters outside the output code page were replaced
    EncodingSubstitution {
        file: String,
        source_text: String,
        substituted: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::MalformedCoordinate {
                contour,
                position,
                north,
                east,
            } => write!(
                f,
                "contour {contour} point {position}: malformed coordinate ({north}, {east}) dropped"
            ),
            Warning::ContourTooShort {
                contour,
                distinct_points,
            } => write!(
                f,
                "contour {contour} has only {distinct_points} distinct point(s) and was skipped"
            ),
            Warning::PartsDiscarded {
                stage,
                kept_area,
                discarded,
            } => write!(
                f,
                "{stage}: kept the largest part ({kept_area:.2} sq m), discarded {discarded} other part(s)"
            ),
            Warning::EmptySetback { distance } => {
                write!(f, "setback at distance {distance} leaves no interior area")
            }
            Warning::NoZoneMatch => f.write_str("no territorial zone intersects the parcel"),
            Warning::AmbiguousZone {
                best_code,
                best_percent,
                candidates,
            } => write!(
                f,
                "parcel intersects {candidates} zones, selected {best_code} ({best_percent:.1}%)"
            ),
            Warning::RestrictionWithoutGeometry { index, name } => write!(
                f,
                "restriction #{index} ({}) has no geometry and was skipped",
                name.as_deref().unwrap_or("unnamed")
            ),
            Warning::EncodingSubstitution {
                file,
                source_text,
                substituted,
            } => write!(
                f,
                "{file}: {substituted} character(s) replaced in '{source_text}'"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_names_parcel_and_stage() {
        let failure = ParcelFailure::new(
            "42:30:0102050:255",
            Stage::BuildParcel,
            AnalysisError::InsufficientGeometry { distinct_points: 2 },
        );
        assert_eq!(
            failure.to_string(),
            "parcel 42:30:0102050:255: parcel construction failed: \
             at least 3 distinct points are required to build a parcel, got 2"
        );
    }

    #[test]
    fn test_stage_names() {
        let stages = [
            Stage::BuildParcel,
            Stage::BuildSetback,
            Stage::Encode,
            Stage::Write,
            Stage::Convert,
        ];
        let names: Vec<String> = stages
            .iter()
            .map(|s| serde_json::to_string(s).unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "\"build_parcel\"",
                "\"build_setback\"",
                "\"encode\"",
                "\"write\"",
                "\"convert\""
            ]
        );
    }
}
