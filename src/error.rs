//! Domain error types
//!
//! Validation failures that callers are expected to match on. Table-level
//! plumbing (CSV I/O, merges, group-bys) reports through `anyhow` with
//! context instead.

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::scoring::SoilProperty;

/// Failures raised by the cell indexer
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("resolution must be an integer between 0 and 15, got {0}")]
    InvalidResolution(i64),

    #[error("coordinate out of range: latitude {lat}, longitude {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("invalid cell identifier '{0}'")]
    InvalidCellId(String),

    #[error("table is missing required column '{0}'")]
    MissingColumn(String),

    #[error("table has no rows")]
    EmptyTable,

    #[error("table has no rows with valid coordinates")]
    NoValidCoordinates,

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Failures raised while scoring soil properties
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{0} value is missing")]
    MissingValue(SoilProperty),

    #[error("{property} value {value} is outside the valid range {valid_range}")]
    OutOfRange {
        property: SoilProperty,
        value: f64,
        valid_range: &'static str,
    },

    #[error("no {0} column found in table (required for scoring)")]
    MissingRequiredColumn(SoilProperty),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Malformed scoring configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("weight for {property} must be finite and non-negative, got {value}")]
    InvalidWeight { property: SoilProperty, value: f64 },

    #[error("weights must sum to a positive value")]
    ZeroWeights,

    #[error("rating bands for {property} are not ordered: {detail}")]
    UnorderedBands {
        property: SoilProperty,
        detail: String,
    },

    #[error("invalid grade table: {0}")]
    InvalidGradeTable(String),

    #[error("no column naming patterns configured for {0}")]
    EmptyPatterns(SoilProperty),

    #[error("chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Invalid area-of-interest parameters
#[derive(Debug, Error, PartialEq)]
pub enum AreaError {
    #[error("invalid coordinates: ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("coordinates ({lat}, {lon}) are outside the Mato Grosso bounds")]
    OutsideStudyArea { lat: f64, lon: f64 },

    #[error("radius must be between 1 and 500 km, got {0}")]
    InvalidRadius(f64),
}
