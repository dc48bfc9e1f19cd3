//! Run configuration
//!
//! Every tunable of an analysis run lives here and is passed explicitly; there
//! is no process-wide state, so concurrent runs with different settings cannot
//! interfere.

use crate::spatial::{AxisOrder, EngineConfig};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings for one parcel analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// How raw `(x, y)` pairs map onto north/east
    pub axis_order: AxisOrder,
    /// Inward offset of the setback zone (negative = inward)
    pub setback_distance: f64,
    /// Mitre length to offset distance ratio for setback corners
    pub miter_limit: f64,
    /// Best overlap below this percentage marks a multi-zone parcel as ambiguous
    pub ambiguity_threshold_percent: f64,
    /// Restriction overlaps smaller than this (sq units) are boundary noise
    pub min_restriction_area: f64,
    /// Zoom multiplier applied to the parcel extent for the initial view
    pub viewport_margin: f64,
    pub engine: EngineConfig,
    /// Directory, relative to the descriptor, holding the converted layer tables
    pub layer_dir: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            axis_order: AxisOrder::NorthEast,
            setback_distance: -5.0,
            miter_limit: 5.0,
            ambiguity_threshold_percent: 99.9,
            min_restriction_area: 1.0,
            viewport_margin: 1.2,
            engine: EngineConfig::default(),
            layer_dir: "layers".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse analysis config")
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path).with_context(|| {
            format!("Failed to read config file {}", path.as_ref().display())
        })?;
        Self::from_json_str(&text)
    }
}
