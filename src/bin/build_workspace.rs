//! Build MapInfo workspaces for one or more parcels
//!
//! Usage:
//!   build_workspace <jobs.json> [options]
//!
//! The job file holds the candidate layers and a list of parcel jobs:
//!   { "layers": { "zones": [...], "restrictions": [...], "capital_objects": [...] },
//!     "jobs": [ { "request": {...}, "output_dir": "...", "layout": {...} } ] }
//!
//! Options:
//!   --config <file>     Analysis config (JSON), defaults otherwise
//!   --convert           Convert written layers to TAB with ogr2ogr
//!   --summary           Print one line per parcel instead of full warnings

use std::env;
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use anyhow::{Context, Result};
use log::{error, info};
use parcel_workspace::mapinfo::Ogr2OgrConverter;
use parcel_workspace::{convert_workspace, run_batch, AnalysisConfig, CandidateLayers, ParcelJob};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct JobFile {
    #[serde(default)]
    layers: CandidateLayers,
    jobs: Vec<ParcelJob>,
}

struct Options {
    job_path: String,
    config_path: Option<String>,
    convert: bool,
    summary: bool,
}

fn parse_args(args: &[String]) -> Option<Options> {
    let job_path = args.get(1)?.clone();
    let mut options = Options {
        job_path,
        config_path: None,
        convert: false,
        summary: false,
    };
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                options.config_path = Some(args.get(i)?.clone());
            }
            "--convert" => options.convert = true,
            "--summary" => options.summary = true,
            other => {
                eprintln!("Unknown option: {}", other);
                return None;
            }
        }
        i += 1;
    }
    Some(options)
}

fn run(options: &Options) -> Result<usize> {
    let config = match &options.config_path {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    let file = File::open(&options.job_path)
        .with_context(|| format!("Failed to open job file {}", options.job_path))?;
    let job_file: JobFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse job file {}", options.job_path))?;

    info!(
        "Loaded {} job(s), {} zone(s), {} restriction(s), {} capital object(s)",
        job_file.jobs.len(),
        job_file.layers.zones.len(),
        job_file.layers.restrictions.len(),
        job_file.layers.capital_objects.len()
    );

    let converter = Ogr2OgrConverter::default();
    let mut failed = 0;
    for result in run_batch(&job_file.jobs, &job_file.layers, &config) {
        let (analysis, artifacts) = match result {
            Ok(done) => done,
            Err(failure) => {
                error!("{}", failure);
                failed += 1;
                continue;
            }
        };

        if options.convert {
            if let Err(failure) = convert_workspace(&artifacts, &converter) {
                error!("{}", failure);
                failed += 1;
                continue;
            }
        }

        let zone = analysis
            .zone
            .best
            .as_ref()
            .map(|m| m.code.as_str())
            .unwrap_or("-");
        println!(
            "{}: area {:.2}, zone {}, {} restriction(s), {} layer(s) -> {}",
            analysis.cadnum,
            analysis.parcel.area,
            zone,
            analysis.restrictions.len(),
            artifacts.layers.len(),
            artifacts.descriptor.display()
        );
        if !options.summary {
            for warning in analysis.warnings.iter().chain(&artifacts.warnings) {
                println!("  warning: {}", warning);
            }
        }
    }
    Ok(failed)
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let Some(options) = parse_args(&args) else {
        eprintln!("Usage: {} <jobs.json> [options]", args[0]);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --config <file>   Analysis config (JSON)");
        eprintln!("  --convert         Convert written layers to TAB with ogr2ogr");
        eprintln!("  --summary         Print one line per parcel");
        return ExitCode::from(2);
    };

    match run(&options) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            eprintln!("{} parcel(s) failed", failed);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
