//! Hand-off to the external MIF → TAB conversion tool
//!
//! The tool must be told the same 8-bit encoding the files declare, or it
//! silently mis-decodes every text attribute. The call blocks and is not
//! retried.

use crate::error::AnalysisError;
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

pub trait LayerConverter {
    /// Convert one `.MIF`/`.MID` pair; returns the produced table path
    fn convert(&self, mif: &Path) -> Result<PathBuf, AnalysisError>;
}

/// Runs `ogr2ogr` with the MapInfo driver
#[derive(Debug, Clone)]
pub struct Ogr2OgrConverter {
    pub program: PathBuf,
    pub encoding: String,
}

impl Default for Ogr2OgrConverter {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ogr2ogr"),
            encoding: "CP1251".to_string(),
        }
    }
}

impl Ogr2OgrConverter {
    pub fn arguments(&self, mif: &Path, tab: &Path) -> Vec<OsString> {
        vec![
            "-f".into(),
            "MapInfo File".into(),
            "-lco".into(),
            format!("ENCODING={}", self.encoding).into(),
            tab.as_os_str().to_owned(),
            mif.as_os_str().to_owned(),
        ]
    }
}

impl LayerConverter for Ogr2OgrConverter {
    fn convert(&self, mif: &Path) -> Result<PathBuf, AnalysisError> {
        let tab = mif.with_extension("TAB");
        // The driver refuses to write over an existing table
        for ext in ["TAB", "DAT", "ID", "MAP"] {
            let stale = mif.with_extension(ext);
            if stale.exists() {
                std::fs::remove_file(&stale).map_err(|source| AnalysisError::Io {
                    path: stale.clone(),
                    source,
                })?;
            }
        }

        let args = self.arguments(mif, &tab);
        debug!("Running {} {:?}", self.program.display(), args);
        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| AnalysisError::Conversion {
                path: mif.to_path_buf(),
                reason: format!("cannot run {}: {}", self.program.display(), e),
            })?;

        if !output.status.success() {
            return Err(AnalysisError::Conversion {
                path: mif.to_path_buf(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        info!("Converted {} -> {}", mif.display(), tab.display());
        Ok(tab)
    }
}
