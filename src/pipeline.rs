//! Pipeline orchestration: index → merge → aggregate → score
//!
//! Each stage receives a table and returns a new one; inputs are never
//! modified. Cancellation, if needed, happens between stages.

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{info, warn};

use crate::aggregate::aggregate_by_cell;
use crate::config::PipelineConfig;
use crate::merge::merge_tables;
use crate::scoring::{score_table, ScoringReport};
use crate::spatial::index_tables;

/// Every intermediate table of one run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Point-level union of all inputs, with `cell_id`
    pub merged: DataFrame,
    /// One row per hexagon
    pub hexagons: DataFrame,
    /// Scored hexagons (rows that could not be scored are absent)
    pub scored: DataFrame,
    pub report: ScoringReport,
}

pub struct SuitabilityPipeline {
    config: PipelineConfig,
}

impl SuitabilityPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.scoring.validate().context("Invalid scoring configuration")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over the named point tables
    ///
    /// Returns `Ok(None)` when no table survives indexing and merging; an
    /// invalid resolution or scoring configuration is an error.
    pub fn run(&self, tables: &[(String, DataFrame)]) -> Result<Option<PipelineOutput>> {
        info!(
            "Running pipeline on {} tables (resolution {}, precision {})",
            tables.len(),
            self.config.resolution,
            self.config.coordinate_precision
        );

        // STEP 1: Index each table
        let indexed = index_tables(tables, self.config.resolution)?;
        if indexed.is_empty() {
            warn!("No table could be indexed");
            return Ok(None);
        }

        // STEP 2: Merge on rounded coordinates
        let merged = merge_tables(&indexed, self.config.coordinate_precision)?;
        if merged.height() == 0 {
            warn!("Merged table is empty");
            return Ok(None);
        }

        // STEP 3: Aggregate by hexagon
        let hexagons = aggregate_by_cell(&merged, self.config.attach_boundaries)?;

        // STEP 4: Score
        let scored = score_table(&hexagons, &self.config.scoring)?;

        Ok(Some(PipelineOutput {
            merged,
            hexagons,
            scored: scored.table,
            report: scored.report,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soc_table() -> DataFrame {
        df! {
            "longitude" => [-56.0, -56.001, -55.0],
            "latitude" => [-12.0, -12.001, -15.0],
            "SOC_res_250_b0 (g/kg)" => [8.0, 8.0, 50.0],
        }
        .unwrap()
    }

    fn ph_table() -> DataFrame {
        df! {
            "longitude" => [-56.0, -56.001, -55.0],
            "latitude" => [-12.0, -12.001, -15.0],
            "soil_pH_res_250_b0" => [5.0, 5.0, 6.5],
        }
        .unwrap()
    }

    #[test]
    fn test_runs_all_stages() {
        let pipeline = SuitabilityPipeline::new(PipelineConfig::default()).unwrap();
        let tables = vec![("soc".to_string(), soc_table()), ("ph".to_string(), ph_table())];

        let output = pipeline.run(&tables).unwrap().unwrap();
        assert_eq!(output.merged.height(), 3);
        assert!(output.hexagons.height() >= 2);
        assert_eq!(output.report.scored_rows, output.hexagons.height());
        assert!(output.scored.column("color_hex").is_ok());
        assert!(output.scored.column("boundary").is_ok());
    }

    #[test]
    fn test_nothing_to_merge_is_not_an_error() {
        let pipeline = SuitabilityPipeline::new(PipelineConfig::default()).unwrap();
        let tables = vec![("bad".to_string(), df! { "value" => [1.0] }.unwrap())];
        assert!(pipeline.run(&tables).unwrap().is_none());
    }

    #[test]
    fn test_invalid_resolution_is_an_error() {
        let config = PipelineConfig {
            resolution: 16,
            ..Default::default()
        };
        let pipeline = SuitabilityPipeline::new(config).unwrap();
        let tables = vec![("soc".to_string(), soc_table())];
        assert!(pipeline.run(&tables).is_err());
    }
}
