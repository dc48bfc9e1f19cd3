// End-to-end runs: registry record in, MIF/MID layers and workspace out
use geo::{polygon, MultiPolygon};
use parcel_workspace::mapinfo::LayerRole;
use parcel_workspace::spatial::{CandidateZone, RawCoord, RestrictionCandidate};
use parcel_workspace::{
    analyze_parcel, run_batch, write_workspace, AnalysisConfig, CandidateLayers, LayoutRequest,
    ParcelJob, ParcelRequest, Stage, Warning,
};
use std::path::Path;

fn square_request(cadnum: &str, side: &str) -> ParcelRequest {
    ParcelRequest {
        cadnum: cadnum.to_string(),
        address: Some("г. Кемерово, ул. Весенняя, 5".to_string()),
        area: Some(10_000.0),
        coordinates: vec![
            RawCoord::new("1", "0", "0"),
            RawCoord::new("2", "0", side),
            RawCoord::new("3", side, side),
            RawCoord::new("4", side, "0"),
        ],
        contours: Vec::new(),
    }
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![polygon![
        (x: x0, y: y0),
        (x: x1, y: y0),
        (x: x1, y: y1),
        (x: x0, y: y1),
        (x: x0, y: y0),
    ]])
}

fn scenario_layers() -> CandidateLayers {
    CandidateLayers {
        zones: vec![CandidateZone {
            code: "Ж-1".into(),
            name: "Зона застройки индивидуальными жилыми домами".into(),
            geometry: Some(rect(-50.0, -50.0, 150.0, 150.0)),
        }],
        restrictions: vec![RestrictionCandidate {
            zone_type: "ЗОУИТ".into(),
            name: Some("Охранная зона объектов электросетевого хозяйства".into()),
            registry_number: Some("42:30-6.123".into()),
            geometry: Some(rect(50.0, -10.0, 120.0, 110.0)),
            ..Default::default()
        }],
        capital_objects: Vec::new(),
    }
}

fn read_cp1251(path: &Path) -> String {
    let bytes = std::fs::read(path).unwrap();
    let (text, _, had_errors) = encoding_rs::WINDOWS_1251.decode(&bytes);
    assert!(!had_errors, "{} is not valid CP1251", path.display());
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_square_parcel_full_workspace() {
        let config = AnalysisConfig::default();
        let analysis =
            analyze_parcel(&square_request("42:30:0101001:15", "100"), &scenario_layers(), &config)
                .expect("analysis failed");

        assert!((analysis.parcel.area - 10_000.0).abs() < 1e-6);
        assert!((analysis.setback.area() - 8_100.0).abs() < 1e-3);
        let zone = analysis.zone.best.as_ref().expect("zone expected");
        assert_eq!(zone.code, "Ж-1");
        assert!(!analysis.zone.is_ambiguous);
        assert_eq!(analysis.restrictions.len(), 1);
        assert!((analysis.restrictions[0].intersection_area - 5_000.0).abs() < 1e-3);
        assert!(analysis.warnings.is_empty(), "{:?}", analysis.warnings);

        let dir = tempfile::tempdir().unwrap();
        let layout = LayoutRequest {
            title: "Схема расположения".into(),
            date: Some("18.10.2026".into()),
            ..Default::default()
        };
        let artifacts = write_workspace(&analysis, &config, Some(&layout), dir.path()).unwrap();

        let roles: Vec<LayerRole> = artifacts.layers.iter().map(|l| l.role).collect();
        assert_eq!(
            roles,
            vec![
                LayerRole::Parcel,
                LayerRole::Setback,
                LayerRole::Restriction(1),
                LayerRole::RestrictionLabels,
                LayerRole::ParcelPoints,
            ]
        );
        for files in &artifacts.layers {
            assert!(files.geometry_file.exists(), "{}", files.geometry_file.display());
            assert!(files.attribute_file.exists(), "{}", files.attribute_file.display());
        }

        let parcel_mif = read_cp1251(&dir.path().join("layers").join("parcel.MIF"));
        assert!(parcel_mif.starts_with("Version   450\nCharset \"WindowsCyrillic\"\n"));
        assert!(parcel_mif.contains("Region  1\n"));
        let parcel_mid = read_cp1251(&dir.path().join("layers").join("parcel.MID"));
        assert_eq!(
            parcel_mid,
            "\"42:30:0101001:15\",\"г. Кемерово, ул. Весенняя, 5\",10000.00\n"
        );

        let descriptor = read_cp1251(&artifacts.descriptor);
        assert!(descriptor.starts_with("!Workspace\n!Version  950\n!Charset WindowsCyrillic\n"));
        let opens: Vec<&str> = descriptor
            .lines()
            .filter(|line| line.starts_with("Open Table"))
            .collect();
        assert_eq!(
            opens,
            vec![
                "Open Table \"layers\\\\parcel.TAB\" As parcel Interactive",
                "Open Table \"layers\\\\setback.TAB\" As setback Interactive",
                "Open Table \"layers\\\\restriction_1.TAB\" As restriction_1 Interactive",
                "Open Table \"layers\\\\restriction_labels.TAB\" As restriction_labels Interactive",
                "Open Table \"layers\\\\parcel_points.TAB\" As parcel_points Interactive",
            ]
        );
        assert!(descriptor.contains("Center (50.00,50.00)"));
        assert!(descriptor.contains("электросетевого"));

        println!("✓ Workspace written with {} layers", artifacts.layers.len());
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let config = AnalysisConfig::default();
        let request = square_request("42:30:0101001:15", "100");
        let layers = scenario_layers();
        let layout = LayoutRequest {
            title: "Схема".into(),
            date: Some("01.02.2026".into()),
            specialist: Some("Иванов И.И.".into()),
            ..Default::default()
        };

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let mut outputs = Vec::new();
        for dir in [&first, &second] {
            let analysis = analyze_parcel(&request, &layers, &config).unwrap();
            outputs.push(write_workspace(&analysis, &config, Some(&layout), dir.path()).unwrap());
        }

        assert_eq!(outputs[0].layers.len(), outputs[1].layers.len());
        for (a, b) in outputs[0].layers.iter().zip(&outputs[1].layers) {
            assert_eq!(std::fs::read(&a.geometry_file).unwrap(), std::fs::read(&b.geometry_file).unwrap());
            assert_eq!(std::fs::read(&a.attribute_file).unwrap(), std::fs::read(&b.attribute_file).unwrap());
        }
        assert_eq!(
            std::fs::read(&outputs[0].descriptor).unwrap(),
            std::fs::read(&outputs[1].descriptor).unwrap()
        );
    }

    #[test]
    fn test_optional_layers_skipped() {
        let config = AnalysisConfig::default();
        let analysis = analyze_parcel(
            &square_request("42:30:0101001:16", "100"),
            &CandidateLayers::default(),
            &config,
        )
        .unwrap();
        assert!(analysis.warnings.contains(&Warning::NoZoneMatch));

        let dir = tempfile::tempdir().unwrap();
        let artifacts = write_workspace(&analysis, &config, None, dir.path()).unwrap();
        let roles: Vec<LayerRole> = artifacts.layers.iter().map(|l| l.role).collect();
        assert_eq!(
            roles,
            vec![LayerRole::Parcel, LayerRole::Setback, LayerRole::ParcelPoints]
        );
        assert!(!dir.path().join("layers").join("restriction_labels.MIF").exists());
        assert!(!dir.path().join("layers").join("capital_objects.MIF").exists());

        let descriptor = read_cp1251(&artifacts.descriptor);
        assert!(!descriptor.contains("restriction"));
        assert!(!descriptor.contains("Layout"));
    }

    #[test]
    fn test_tiny_parcel_has_no_setback_layer() {
        let config = AnalysisConfig::default();
        let analysis = analyze_parcel(
            &square_request("42:30:0101001:17", "8"),
            &CandidateLayers::default(),
            &config,
        )
        .unwrap();
        assert!(analysis.setback.is_empty());
        assert!(analysis
            .warnings
            .iter()
            .any(|w| matches!(w, Warning::EmptySetback { .. })));

        let dir = tempfile::tempdir().unwrap();
        let artifacts = write_workspace(&analysis, &config, None, dir.path()).unwrap();
        assert!(artifacts.layers.iter().all(|l| l.role != LayerRole::Setback));
        assert!(!dir.path().join("layers").join("setback.MIF").exists());
    }

    #[test]
    fn test_unmappable_text_reports_substitution() {
        let config = AnalysisConfig::default();
        let mut request = square_request("42:30:0101001:18", "100");
        request.address = Some("ул. Садовая ✓".to_string());
        let analysis = analyze_parcel(&request, &CandidateLayers::default(), &config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let artifacts = write_workspace(&analysis, &config, None, dir.path()).unwrap();
        assert_eq!(
            artifacts.warnings,
            vec![Warning::EncodingSubstitution {
                file: "parcel.MID".into(),
                source_text: "ул. Садовая ✓".into(),
                substituted: 1,
            }]
        );
        let parcel_mid = read_cp1251(&dir.path().join("layers").join("parcel.MID"));
        assert!(parcel_mid.contains("\"ул. Садовая ?\""));
    }

    #[test]
    fn test_layout_substitution_names_descriptor() {
        let config = AnalysisConfig::default();
        let analysis = analyze_parcel(
            &square_request("42:30:0101001:23", "100"),
            &scenario_layers(),
            &config,
        )
        .unwrap();
        let layout = LayoutRequest {
            title: "Схема ★".into(),
            ..Default::default()
        };

        let dir = tempfile::tempdir().unwrap();
        let artifacts = write_workspace(&analysis, &config, Some(&layout), dir.path()).unwrap();
        assert_eq!(
            artifacts.warnings,
            vec![Warning::EncodingSubstitution {
                file: "workspace.WOR".into(),
                source_text: "Схема ★".into(),
                substituted: 1,
            }]
        );
        assert!(read_cp1251(&artifacts.descriptor).contains("Схема ?"));
    }

    #[test]
    fn test_batch_keeps_job_order_and_isolates_failures() {
        let config = AnalysisConfig::default();
        let layers = scenario_layers();
        let root = tempfile::tempdir().unwrap();

        let mut broken = square_request("42:30:0101001:20", "100");
        broken.coordinates.truncate(2);
        let jobs = vec![
            ParcelJob {
                request: square_request("42:30:0101001:19", "100"),
                output_dir: root.path().join("a"),
                layout: None,
            },
            ParcelJob {
                request: broken,
                output_dir: root.path().join("b"),
                layout: None,
            },
            ParcelJob {
                request: square_request("42:30:0101001:21", "60"),
                output_dir: root.path().join("c"),
                layout: None,
            },
        ];

        let results = run_batch(&jobs, &layers, &config);
        assert_eq!(results.len(), 3);
        let (first, _) = results[0].as_ref().expect("first job failed");
        assert_eq!(first.cadnum, "42:30:0101001:19");
        let failure = results[1].as_ref().unwrap_err();
        assert_eq!(failure.cadnum, "42:30:0101001:20");
        assert_eq!(failure.stage, Stage::BuildParcel);
        let (third, artifacts) = results[2].as_ref().expect("third job failed");
        assert!((third.parcel.area - 3_600.0).abs() < 1e-6);
        assert!(artifacts.descriptor.starts_with(root.path().join("c")));
        assert!(!root.path().join("b").join("workspace.WOR").exists());
    }

    #[test]
    fn test_ambiguous_zone_warning() {
        let config = AnalysisConfig::default();
        let layers = CandidateLayers {
            zones: vec![
                CandidateZone {
                    code: "Ж-1".into(),
                    name: "Жилая".into(),
                    geometry: Some(rect(0.0, 0.0, 80.0, 100.0)),
                },
                CandidateZone {
                    code: "П-1".into(),
                    name: "Производственная".into(),
                    geometry: Some(rect(80.0, 0.0, 200.0, 100.0)),
                },
            ],
            ..Default::default()
        };
        let analysis =
            analyze_parcel(&square_request("42:30:0101001:22", "100"), &layers, &config).unwrap();
        assert!(analysis.zone.is_ambiguous);
        match analysis.warnings.as_slice() {
            [Warning::AmbiguousZone { best_code, candidates, .. }] => {
                assert_eq!(best_code, "Ж-1");
                assert_eq!(*candidates, 2);
            }
            other => panic!("unexpected warnings {:?}", other),
        }
    }
}
