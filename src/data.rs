//! Table sources and persistence
//!
//! The raster reader is an external collaborator: it hands over one point
//! table per raster with `longitude`, `latitude` and a value column whose
//! name encodes the property, depth layer and unit (for example
//! `SOC_res_250_b0 (g/kg)`). [`TableSource`] is that boundary;
//! [`CsvDirectory`] reads the CSV snapshots such a reader leaves behind.

use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::spatial::{LATITUDE_COL, LONGITUDE_COL};

/// Marker for files written by this crate; never read back as inputs
pub const OUTPUT_MARKER: &str = "suitability";

/// Anything that can supply named per-raster point tables
pub trait TableSource {
    fn point_tables(&self) -> Result<Vec<(String, DataFrame)>>;
}

/// Every `*.csv` file in one directory, one table per file
///
/// Files are read in name order. Coarse `res_3000` tables are ignored when
/// a `res_250` table for the same dataset is present.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    dir: PathBuf,
}

impl CsvDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Input files after filtering
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            })
            .filter(|path| !file_name(path).to_lowercase().contains(OUTPUT_MARKER))
            .collect();
        files.sort();

        let fine: FxHashSet<String> = files
            .iter()
            .map(|p| file_name(p))
            .filter(|name| name.contains("res_250"))
            .collect();

        files.retain(|path| {
            let name = file_name(path);
            let superseded = name.contains("res_3000") && fine.contains(&name.replace("res_3000", "res_250"));
            if superseded {
                info!("Ignoring {} (250 m version available)", name);
            }
            !superseded
        });

        Ok(files)
    }
}

impl TableSource for CsvDirectory {
    fn point_tables(&self) -> Result<Vec<(String, DataFrame)>> {
        let mut tables = Vec::new();
        for path in self.files()? {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name(&path));

            match load_csv(&path) {
                Ok(df) => {
                    debug!("Loaded {}: {} rows × {} columns", name, df.height(), df.width());
                    tables.push((name, df));
                }
                Err(err) => warn!("Skipping {}: {:#}", path.display(), err),
            }
        }

        info!("Loaded {} tables from {}", tables.len(), self.dir.display());
        Ok(tables)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read one CSV with a header row, normalising `lon`/`lat` headers
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to create CSV reader: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to load CSV: {}", path.display()))?;

    for (short, full) in [("lon", LONGITUDE_COL), ("lat", LATITUDE_COL)] {
        if df.get_column_index(full).is_none() && df.get_column_index(short).is_some() {
            df.rename(short, full.into())?;
        }
    }

    Ok(df)
}

/// Write a table as CSV with a header row, creating parent directories
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    let mut out = df.clone();
    CsvWriter::new(file)
        .include_header(true)
        .finish(&mut out)
        .with_context(|| format!("Failed to write CSV: {}", path.display()))?;

    debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
