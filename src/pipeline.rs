//! End-to-end parcel run
//!
//! `analyze_parcel` is pure in-memory work; `write_workspace` turns the result
//! into layer file pairs plus the descriptor inside a caller-owned directory.
//! Runs share nothing, so `run_batch` simply fans independent jobs out over
//! the rayon pool. Each job must target its own directory.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, ParcelFailure, Stage, Warning};
use crate::mapinfo::{
    capital_objects_layer, parcel_layer, parcel_points_layer, restriction_labels_layer,
    restriction_layers, setback_layer, LayerConverter, LayerRef, LayerRole, MifEncoder, Paper,
    PrintLayout, VectorLayer, Viewport, WorkspaceComposer,
};
use crate::spatial::{
    build_parcel, build_setback, find_capital_objects, intersect_restrictions, match_zone,
    normalize, CandidateZone, CapitalObject, CapitalObjectCandidate, Contour, ParcelGeometry,
    PlanarEngine, RawContour, RawCoord, RestrictionCandidate, RestrictionStyle, RestrictionZone,
    Setback, ZoneResolution,
};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Descriptor file name inside the output directory
pub const DESCRIPTOR_FILE: &str = "workspace.WOR";

/// A parsed registry record for one parcel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParcelRequest {
    pub cadnum: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Area declared by the registry
    #[serde(default)]
    pub area: Option<f64>,
    /// Flat boundary, used when no contours are given
    #[serde(default)]
    pub coordinates: Vec<RawCoord>,
    #[serde(default)]
    pub contours: Vec<RawContour>,
}

/// Read-only snapshots of the external layers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateLayers {
    pub zones: Vec<CandidateZone>,
    pub restrictions: Vec<RestrictionCandidate>,
    pub capital_objects: Vec<CapitalObjectCandidate>,
}

/// Everything computed for one parcel
#[derive(Debug, Clone)]
pub struct ParcelAnalysis {
    pub cadnum: String,
    pub address: Option<String>,
    pub declared_area: Option<f64>,
    pub contours: Vec<Contour>,
    pub dropped_points: usize,
    pub parcel: ParcelGeometry,
    pub setback: Setback,
    pub zone: ZoneResolution,
    pub restrictions: Vec<RestrictionZone>,
    pub capital_objects: Vec<CapitalObject>,
    pub warnings: Vec<Warning>,
}

pub fn analyze_parcel(
    request: &ParcelRequest,
    layers: &CandidateLayers,
    config: &AnalysisConfig,
) -> Result<ParcelAnalysis, ParcelFailure> {
    let cadnum = request.cadnum.as_str();
    info!("Analyzing parcel {}", cadnum);
    let engine = PlanarEngine::new(config.engine);

    let raw: Vec<RawContour> = if request.contours.is_empty() {
        vec![request.coordinates.clone()]
    } else {
        request.contours.clone()
    };
    let normalized = normalize(&raw, config.axis_order);
    let mut warnings = normalized.warnings;

    let parcel = build_parcel(&engine, &normalized.contours, &mut warnings)
        .map_err(|e| ParcelFailure::new(cadnum, Stage::BuildParcel, e))?;
    let setback = build_setback(
        &engine,
        &parcel,
        config.setback_distance,
        config.miter_limit,
        &mut warnings,
    );

    let zone = match_zone(&engine, &parcel, &layers.zones, config.ambiguity_threshold_percent);
    match &zone.best {
        None => warnings.push(Warning::NoZoneMatch),
        Some(best) if zone.is_ambiguous => {
            warn!("Parcel {} lies in {} zones", cadnum, zone.all_matches.len());
            warnings.push(Warning::AmbiguousZone {
                best_code: best.code.clone(),
                best_percent: best.overlap_percent,
                candidates: zone.all_matches.len(),
            });
        }
        Some(_) => {}
    }

    let restrictions = intersect_restrictions(
        &engine,
        &parcel,
        &layers.restrictions,
        config.min_restriction_area,
        &mut warnings,
    );
    let capital_objects = find_capital_objects(&engine, &parcel, &layers.capital_objects);

    info!(
        "Parcel {}: area {:.2}, setback {:.2}, {} restriction(s), {} warning(s)",
        cadnum,
        parcel.area,
        setback.area(),
        restrictions.len(),
        warnings.len()
    );

    Ok(ParcelAnalysis {
        cadnum: cadnum.to_string(),
        address: request.address.clone(),
        declared_area: request.area,
        contours: normalized.contours,
        dropped_points: normalized.dropped,
        parcel,
        setback,
        zone,
        restrictions,
        capital_objects,
        warnings,
    })
}

/// Print layout options supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutRequest {
    pub paper: Paper,
    pub title: String,
    pub specialist: Option<String>,
    pub date: Option<String>,
}

impl LayoutRequest {
    fn for_analysis(&self, analysis: &ParcelAnalysis) -> PrintLayout {
        PrintLayout {
            paper: self.paper,
            title: self.title.clone(),
            cadnum: analysis.cadnum.clone(),
            address: analysis.address.clone(),
            specialist: self.specialist.clone(),
            date: self.date.clone(),
            area: analysis.declared_area.or(Some(analysis.parcel.area)),
            legend: Vec::new(),
        }
        .with_legend(analysis.restrictions.iter().filter_map(|z| {
            z.name
                .as_deref()
                .map(|name| (name, z.registry_number.as_deref()))
        }))
    }
}

/// A written `.MIF`/`.MID` pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerFiles {
    pub role: LayerRole,
    pub geometry_file: PathBuf,
    pub attribute_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct WorkspaceArtifacts {
    pub cadnum: String,
    pub descriptor: PathBuf,
    /// In generation order, matching the descriptor's open-statements
    pub layers: Vec<LayerFiles>,
    /// Code-page substitutions made while encoding layers and the descriptor
    pub warnings: Vec<Warning>,
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), AnalysisError> {
    let io_err = |source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(bytes).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    Ok(())
}

/// Layers in generation order: parcel, setback, capital objects, restrictions,
/// restriction labels, boundary points
fn build_layers(analysis: &ParcelAnalysis) -> Vec<VectorLayer> {
    let cadnum = analysis.cadnum.as_str();
    let mut layers = vec![parcel_layer(
        cadnum,
        analysis.address.as_deref(),
        analysis.declared_area.or(Some(analysis.parcel.area)),
        &analysis.parcel,
    )];
    layers.extend(setback_layer(cadnum, &analysis.setback));
    layers.extend(capital_objects_layer(&analysis.capital_objects));
    layers.extend(restriction_layers(&analysis.restrictions));
    layers.extend(restriction_labels_layer(&analysis.restrictions));
    layers.push(parcel_points_layer(cadnum, &analysis.contours));
    layers
}

/// Write every layer pair and the descriptor under `dir`.
///
/// Layer files go to `dir/<layer_dir>`, the descriptor to `dir/workspace.WOR`.
/// A layer only gets an open-statement once both of its files are written.
pub fn write_workspace(
    analysis: &ParcelAnalysis,
    config: &AnalysisConfig,
    layout: Option<&LayoutRequest>,
    dir: &Path,
) -> Result<WorkspaceArtifacts, ParcelFailure> {
    let cadnum = analysis.cadnum.as_str();
    let fail = |stage, e| ParcelFailure::new(cadnum, stage, e);

    let layer_dir = dir.join(&config.layer_dir);
    std::fs::create_dir_all(&layer_dir).map_err(|source| {
        fail(
            Stage::Write,
            AnalysisError::Io {
                path: layer_dir.clone(),
                source,
            },
        )
    })?;

    let mut refs = Vec::new();
    let mut written = Vec::new();
    let mut warnings = Vec::new();

    for layer in build_layers(analysis) {
        let stem = layer.role.file_stem();
        let encoded = MifEncoder::new(&layer)
            .encode()
            .map_err(|e| fail(Stage::Encode, e))?;
        let geometry_file = layer_dir.join(format!("{stem}.MIF"));
        let attribute_file = layer_dir.join(format!("{stem}.MID"));
        write_file(&geometry_file, &encoded.geometry_file).map_err(|e| fail(Stage::Write, e))?;
        write_file(&attribute_file, &encoded.attribute_file).map_err(|e| fail(Stage::Write, e))?;

        warnings.extend(encoded.substitutions.into_iter().map(|s| {
            Warning::EncodingSubstitution {
                file: format!("{stem}.MID"),
                source_text: s.source_text,
                substituted: s.substituted,
            }
        }));

        refs.push(match layer.role {
            LayerRole::Restriction(position) => {
                let name = analysis
                    .restrictions
                    .get(position - 1)
                    .and_then(|z| z.name.as_deref())
                    .unwrap_or("");
                LayerRef::restriction(position, RestrictionStyle::for_name(name))
            }
            role => LayerRef::fixed(role),
        });
        written.push(LayerFiles {
            role: layer.role,
            geometry_file,
            attribute_file,
        });
    }

    let viewport = PlanarEngine::new(config.engine)
        .bounds(&analysis.parcel.shape)
        .map(|bounds| Viewport::around(bounds, config.viewport_margin))
        .unwrap_or(Viewport {
            center_x: 0.0,
            center_y: 0.0,
            zoom: 1.0,
        });
    let print_layout = layout.map(|l| l.for_analysis(analysis));
    let (descriptor_bytes, descriptor_substitutions) = WorkspaceComposer::new(&refs, viewport)
        .layer_dir(&config.layer_dir)
        .layout(print_layout.as_ref())
        .compose();
    warnings.extend(
        descriptor_substitutions
            .into_iter()
            .map(|s| Warning::EncodingSubstitution {
                file: DESCRIPTOR_FILE.to_string(),
                source_text: s.source_text,
                substituted: s.substituted,
            }),
    );
    let descriptor = dir.join(DESCRIPTOR_FILE);
    write_file(&descriptor, &descriptor_bytes).map_err(|e| fail(Stage::Write, e))?;

    info!(
        "Parcel {}: wrote {} layer pair(s) and {}",
        cadnum,
        written.len(),
        descriptor.display()
    );
    Ok(WorkspaceArtifacts {
        cadnum: cadnum.to_string(),
        descriptor,
        layers: written,
        warnings,
    })
}

/// Convert every written layer with an external tool, in generation order
pub fn convert_workspace(
    artifacts: &WorkspaceArtifacts,
    converter: &dyn LayerConverter,
) -> Result<Vec<PathBuf>, ParcelFailure> {
    artifacts
        .layers
        .iter()
        .map(|files| {
            converter
                .convert(&files.geometry_file)
                .map_err(|e| ParcelFailure::new(artifacts.cadnum.as_str(), Stage::Convert, e))
        })
        .collect()
}

/// One independent parcel run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelJob {
    pub request: ParcelRequest,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub layout: Option<LayoutRequest>,
}

/// Analyze and write one job
pub fn run_job(
    job: &ParcelJob,
    layers: &CandidateLayers,
    config: &AnalysisConfig,
) -> Result<(ParcelAnalysis, WorkspaceArtifacts), ParcelFailure> {
    let analysis = analyze_parcel(&job.request, layers, config)?;
    let artifacts = write_workspace(&analysis, config, job.layout.as_ref(), &job.output_dir)?;
    Ok((analysis, artifacts))
}

/// Run independent jobs in parallel; results keep job order
pub fn run_batch(
    jobs: &[ParcelJob],
    layers: &CandidateLayers,
    config: &AnalysisConfig,
) -> Vec<Result<(ParcelAnalysis, WorkspaceArtifacts), ParcelFailure>> {
    info!("Running {} parcel job(s)", jobs.len());
    jobs.par_iter()
        .map(|job| run_job(job, layers, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_request(cadnum: &str) -> ParcelRequest {
        let coordinates = vec![
            RawCoord::new("1", "0", "0"),
            RawCoord::new("2", "0", "100"),
            RawCoord::new("3", "100", "100"),
            RawCoord::new("4", "100", "0"),
        ];
        ParcelRequest {
            cadnum: cadnum.to_string(),
            coordinates,
            ..Default::default()
        }
    }

    #[test]
    fn test_coordinates_used_when_no_contours() {
        let config = AnalysisConfig::default();
        let layers = CandidateLayers::default();
        let analysis = analyze_parcel(&square_request("1:1:1:1"), &layers, &config).unwrap();
        assert!((analysis.parcel.area - 10_000.0).abs() < 1e-9);
        assert!(analysis.zone.best.is_none());
        assert!(analysis.warnings.contains(&Warning::NoZoneMatch));
    }

    #[test]
    fn test_failure_names_parcel_and_stage() {
        let request = ParcelRequest {
            cadnum: "42:30:0000000:1".into(),
            coordinates: vec![RawCoord::new("1", "0", "0"), RawCoord::new("2", "1", "1")],
            ..Default::default()
        };
        let layers = CandidateLayers::default();
        let failure = analyze_parcel(&request, &layers, &AnalysisConfig::default()).unwrap_err();
        assert_eq!(failure.cadnum, "42:30:0000000:1");
        assert_eq!(failure.stage, Stage::BuildParcel);
        assert!(matches!(
            failure.source,
            AnalysisError::InsufficientGeometry { distinct_points: 2 }
        ));
    }

    #[test]
    fn test_layer_generation_order() {
        let config = AnalysisConfig::default();
        let layers = CandidateLayers::default();
        let analysis = analyze_parcel(&square_request("1:1:1:1"), &layers, &config).unwrap();
        let roles: Vec<LayerRole> = build_layers(&analysis).iter().map(|l| l.role).collect();
        assert_eq!(
            roles,
            vec![LayerRole::Parcel, LayerRole::Setback, LayerRole::ParcelPoints]
        );
    }

    #[test]
    fn test_points_layer_follows_restrictions() {
        use crate::spatial::ObjectGeometry;
        use geo::{polygon, MultiPolygon, Point};

        let layers = CandidateLayers {
            restrictions: vec![RestrictionCandidate {
                name: Some("Охранная зона газопровода".into()),
                geometry: Some(MultiPolygon::new(vec![polygon![
                    (x: 50.0, y: -10.0),
                    (x: 120.0, y: -10.0),
                    (x: 120.0, y: 110.0),
                    (x: 50.0, y: 110.0),
                ]])),
                ..Default::default()
            }],
            capital_objects: vec![CapitalObjectCandidate {
                cadnum: Some("1:1:1:100".into()),
                geometry: Some(ObjectGeometry::Point(Point::new(20.0, 20.0))),
                ..Default::default()
            }],
            ..Default::default()
        };
        let analysis =
            analyze_parcel(&square_request("1:1:1:1"), &layers, &AnalysisConfig::default()).unwrap();
        let roles: Vec<LayerRole> = build_layers(&analysis).iter().map(|l| l.role).collect();
        assert_eq!(
            roles,
            vec![
                LayerRole::Parcel,
                LayerRole::Setback,
                LayerRole::CapitalObjects,
                LayerRole::Restriction(1),
                LayerRole::RestrictionLabels,
                LayerRole::ParcelPoints,
            ]
        );
    }
}
