//! Parcel spatial resolution and MapInfo workspace generation
//!
//! A registry record for one land parcel goes in; a set of MIF/MID layers and
//! a `.WOR` workspace descriptor come out.
//!
//! # Modules
//! - `config` - Analysis parameters with JSON loading
//! - `error` - Error, failure and warning types
//! - `spatial` - Coordinate normalization, geometry and overlap resolution
//! - `mapinfo` - MIF/MID encoding, layer building and workspace composition
//! - `pipeline` - End-to-end parcel runs and parallel batches

pub mod config;
pub mod error;
pub mod mapinfo;
pub mod pipeline;
pub mod spatial;

pub use config::AnalysisConfig;
pub use error::{AnalysisError, ParcelFailure, Stage, Warning};
pub use pipeline::{
    analyze_parcel,
    convert_workspace,
    run_batch,
    run_job,
    write_workspace,
    CandidateLayers,
    LayoutRequest,
    ParcelAnalysis,
    ParcelJob,
    ParcelRequest,
    WorkspaceArtifacts,
};
