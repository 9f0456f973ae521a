//! Biochar suitability scoring on a hexagonal grid
//!
//! Point tables sampled from soil rasters (moisture, organic carbon, pH,
//! temperature) are indexed to H3 cells, merged on rounded coordinates,
//! averaged per hexagon and scored. The suitability score is the complement
//! of a weighted soil quality index: poorer soils benefit more from biochar.
//!
//! Stages, leaf first:
//! - [`spatial`]: cell indexing, cell boundaries, area of interest
//! - [`merge`]: outer join of per-raster tables
//! - [`aggregate`]: per-hexagon means and point counts
//! - [`scoring`]: unit conversion, rating bands, weighted index, grades
//! - [`pipeline`]: runs the stages in order

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod scoring;
pub mod spatial;
pub mod utils;

pub use aggregate::{aggregate_by_cell, BOUNDARY_COL, POINT_COUNT_COL};
pub use config::{MissingValueDefaults, PipelineConfig, PropertyWeights, ScoringConfig};
pub use data::{load_csv, write_csv, CsvDirectory, TableSource};
pub use error::{AreaError, ConfigError, IndexError, ScoringError};
pub use merge::{merge_tables, MAX_COORDINATE_PRECISION};
pub use pipeline::{PipelineOutput, SuitabilityPipeline};
pub use scoring::{
    score_soil, score_table, Rating, ScoredTable, ScoringReport, SoilInputs, SoilProperty,
    SuitabilityGrade, SuitabilityResult,
};
pub use spatial::{cell_boundary, index, index_table, index_tables, AreaOfInterest};
pub use utils::{cache_key, CacheParams, FileFingerprint};
