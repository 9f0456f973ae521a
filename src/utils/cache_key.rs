//! Cache keys for memoised pipeline runs
//!
//! The pipeline is a pure function of its input files and parameters, so a
//! result can be reused whenever both are unchanged. The key hashes the
//! rounded area of interest, the grid parameters and a fingerprint (name,
//! modification time, size) of every input file. FxHasher has no random
//! state, so keys are stable across processes.

use anyhow::{Context, Result};
use rustc_hash::FxHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::spatial::AreaOfInterest;

/// Identity of one input file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileFingerprint {
    pub name: String,
    pub modified_nanos: u128,
    pub size_bytes: u64,
}

impl FileFingerprint {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read metadata: {}", path.display()))?;
        let modified_nanos = metadata
            .modified()
            .with_context(|| format!("No modification time for {}", path.display()))?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            modified_nanos,
            size_bytes: metadata.len(),
        })
    }
}

/// Parameters that change the pipeline output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheParams {
    pub area: AreaOfInterest,
    pub resolution: u8,
    pub coordinate_precision: u32,
}

impl CacheParams {
    fn canonical(&self) -> String {
        let area = match self.area {
            AreaOfInterest::FullState => "full_state".to_string(),
            // 6 dp is ~0.1 m; radius to 10 m
            AreaOfInterest::Circle { lat, lon, radius_km } => {
                format!("circle:{:.6}:{:.6}:{:.2}", lat, lon, radius_km)
            }
        };
        format!("{}|res:{}|precision:{}", area, self.resolution, self.coordinate_precision)
    }
}

/// 32 hex digit key; file order does not matter
pub fn cache_key(params: &CacheParams, fingerprints: &[FileFingerprint]) -> String {
    let mut files: Vec<&FileFingerprint> = fingerprints.iter().collect();
    files.sort();

    let mut canonical = params.canonical();
    for file in files {
        canonical.push_str(&format!("|{}:{}:{}", file.name, file.modified_nanos, file.size_bytes));
    }

    let mut first = FxHasher::default();
    canonical.hash(&mut first);
    let high = first.finish();

    let mut second = FxHasher::default();
    high.hash(&mut second);
    canonical.len().hash(&mut second);
    canonical.hash(&mut second);
    let low = second.finish();

    format!("{:016x}{:016x}", high, low)
}
