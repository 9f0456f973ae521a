//! Scoring and pipeline configuration
//!
//! Every value has a built-in default matching the published heuristics;
//! a JSON file may override any subset of them:
//!
//! ```json
//! { "weights": { "soc": 1.5 }, "chunk_size": 5000 }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::scoring::{ColumnPatterns, GradeTable, PropertyBands, SoilProperty};
use crate::spatial::DEFAULT_RESOLUTION;

/// Rows scored per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Decimal places used to form the merge key
pub const DEFAULT_COORDINATE_PRECISION: u32 = 6;

/// Per-property weights of the composite index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyWeights {
    pub moisture: f64,
    pub soc: f64,
    pub ph: f64,
    pub temperature: f64,
}

impl Default for PropertyWeights {
    fn default() -> Self {
        Self {
            moisture: 0.5,
            soc: 1.0,
            ph: 0.7,
            temperature: 0.2,
        }
    }
}

impl PropertyWeights {
    pub fn weight(&self, property: SoilProperty) -> f64 {
        match property {
            SoilProperty::Moisture => self.moisture,
            SoilProperty::Soc => self.soc,
            SoilProperty::Ph => self.ph,
            SoilProperty::Temperature => self.temperature,
        }
    }

    pub fn total(&self) -> f64 {
        SoilProperty::ALL.iter().map(|&p| self.weight(p)).sum()
    }

    /// Highest reachable weighted score (every property rated Good)
    pub fn maximum_possible_score(&self) -> f64 {
        3.0 * self.total()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for property in SoilProperty::ALL {
            let value = self.weight(property);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { property, value });
            }
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        Ok(())
    }
}

/// Values substituted for missing optional properties (canonical units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingValueDefaults {
    pub moisture_pct: f64,
    pub temperature_celsius: f64,
}

impl Default for MissingValueDefaults {
    fn default() -> Self {
        Self {
            moisture_pct: 50.0,
            temperature_celsius: 20.0,
        }
    }
}

/// Everything the property scorer needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: PropertyWeights,
    pub bands: PropertyBands,
    pub grades: GradeTable,
    pub patterns: ColumnPatterns,
    pub defaults: MissingValueDefaults,
    pub chunk_size: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: PropertyWeights::default(),
            bands: PropertyBands::default(),
            grades: GradeTable::default(),
            patterns: ColumnPatterns::default(),
            defaults: MissingValueDefaults::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ScoringConfig {
    /// Load overrides from a JSON file and validate the result
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&contents).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        tracing::debug!("Loaded scoring config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ScoringConfig = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.bands.validate()?;
        self.grades.validate()?;
        self.patterns.validate()?;
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        Ok(())
    }
}

/// Parameters for the whole index → merge → aggregate → score run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub resolution: u8,
    pub coordinate_precision: u32,
    pub attach_boundaries: bool,
    pub scoring: ScoringConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            coordinate_precision: DEFAULT_COORDINATE_PRECISION,
            attach_boundaries: true,
            scoring: ScoringConfig::default(),
        }
    }
}
