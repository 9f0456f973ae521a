//! Table-level scoring
//!
//! Applies [`score_soil`] to every row of an aggregated (or per-point) table:
//!
//! - STEP 1: discover property columns (required SOC and pH must exist)
//! - STEP 2: per chunk, average depth layers and convert raw units
//! - STEP 3: skip rows missing SOC or pH, default missing moisture/temperature
//! - STEP 4: score, tallying rows that fail validation instead of aborting
//! - STEP 5: append result columns to the surviving rows
//!
//! Rows are processed in fixed-size slices so peak memory stays bounded by
//! the chunk size rather than the table height. Chunk order never affects
//! the output because each row is scored independently.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::scoring::columns::{discover_columns, DiscoveredColumns, PropertyColumns};
use crate::scoring::units::{kelvin_to_celsius, moisture_to_percent, soc_to_percent};
use crate::scoring::{score_soil, SoilInputs, SoilProperty, SuitabilityGrade, SuitabilityResult};

/// Canonical input columns, in `SoilProperty::ALL` order
pub const INPUT_COLUMNS: [&str; 4] = [
    "input_moisture_pct",
    "input_soc_pct",
    "input_ph",
    "input_temperature_celsius",
];

pub const SOIL_QUALITY_INDEX_COL: &str = "soil_quality_index";
pub const SUITABILITY_SCORE_COL: &str = "biochar_suitability_score";
pub const GRADE_COL: &str = "suitability_grade";
pub const COLOR_COL: &str = "color_hex";
pub const RECOMMENDATION_COL: &str = "recommendation";

const PER_PROPERTY_PREFIXES: [&str; 3] = ["property_ratings_", "property_scores_", "weighted_scores_"];

/// Names of every column [`score_table`] appends
pub fn output_column_names() -> Vec<String> {
    let mut names: Vec<String> = INPUT_COLUMNS.iter().map(|s| s.to_string()).collect();
    for prefix in PER_PROPERTY_PREFIXES {
        names.extend(SoilProperty::ALL.iter().map(|p| format!("{}{}", prefix, p.key())));
    }
    names.extend(
        [
            SOIL_QUALITY_INDEX_COL,
            SUITABILITY_SCORE_COL,
            GRADE_COL,
            COLOR_COL,
            RECOMMENDATION_COL,
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    names
}

pub(crate) fn is_scoring_output_column(lowered: &str) -> bool {
    output_column_names().iter().any(|name| name == lowered)
}

/// Row accounting for one scoring run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoringReport {
    pub total_rows: usize,
    pub scored_rows: usize,
    /// Rows without SOC or without pH (both depth layers null)
    pub missing_required_rows: usize,
    /// Rows rejected by range validation
    pub out_of_range_rows: usize,
    pub moisture_defaulted: usize,
    pub temperature_defaulted: usize,
    pub grade_counts: BTreeMap<SuitabilityGrade, usize>,
}

impl ScoringReport {
    /// Rows excluded from the scored output
    pub fn invalid_rows(&self) -> usize {
        self.missing_required_rows + self.out_of_range_rows
    }
}

/// Scored rows plus the accounting that explains the missing ones
#[derive(Debug, Clone)]
pub struct ScoredTable {
    pub table: DataFrame,
    pub report: ScoringReport,
}

/// Score every row of `df`
///
/// Returns a new table holding only the rows that could be scored, with the
/// result columns appended. Configuration problems and a table without any
/// SOC or pH column are errors; bad rows are counted and skipped.
pub fn score_table(df: &DataFrame, config: &ScoringConfig) -> Result<ScoredTable> {
    config.validate().context("Invalid scoring configuration")?;

    // STEP 1: Column discovery
    let columns = discover_columns(df, &config.patterns);
    for property in SoilProperty::ALL {
        let found = columns.get(property);
        if found.is_empty() {
            if property.is_required() {
                return Err(ScoringError::MissingRequiredColumn(property).into());
            }
            warn!(
                "No {} column found; every row uses the default value",
                property
            );
        } else {
            debug!("{} column(s): {:?}", property, found.names().collect::<Vec<_>>());
        }
    }

    // Re-scoring replaces earlier results instead of colliding with them
    let stale: Vec<String> = output_column_names()
        .into_iter()
        .filter(|name| df.get_column_index(name).is_some())
        .collect();
    let source = if stale.is_empty() { df.clone() } else { df.drop_many(stale) };

    let mut report = ScoringReport {
        total_rows: source.height(),
        ..Default::default()
    };
    let mut scored: Option<DataFrame> = None;

    let mut offset = 0;
    while offset < source.height() {
        let length = config.chunk_size.min(source.height() - offset);
        let chunk = source.slice(offset as i64, length);

        let chunk_scored = score_chunk(&chunk, offset, &columns, config, &mut report)
            .with_context(|| format!("Failed to score rows {}..{}", offset, offset + length))?;
        debug!(
            "Scored chunk at row {}: {}/{} rows kept",
            offset,
            chunk_scored.height(),
            length
        );

        match scored.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&chunk_scored)?;
            }
            None => scored = Some(chunk_scored),
        }
        offset += length;
    }

    let mut table = match scored {
        Some(table) => table,
        // Empty input: keep the schema shape with zero rows
        None => source.hstack(&ResultColumns::default().into_columns())?,
    };
    table.align_chunks();

    log_summary(&table, &report)?;
    Ok(ScoredTable { table, report })
}

/// Score one slice of the table; `offset` is the slice's first row in the full table
fn score_chunk(
    chunk: &DataFrame,
    offset: usize,
    columns: &DiscoveredColumns,
    config: &ScoringConfig,
    report: &mut ScoringReport,
) -> Result<DataFrame> {
    // STEP 2: Layer-averaged raw values (NaN already folded into None)
    let moisture = property_values(chunk, &columns.moisture)?;
    let soc = property_values(chunk, &columns.soc)?;
    let ph = property_values(chunk, &columns.ph)?;
    let temperature = property_values(chunk, &columns.temperature)?;

    let mut keep = Vec::with_capacity(chunk.height());
    let mut results = ResultColumns::default();

    for idx in 0..chunk.height() {
        // STEP 3: Required properties skip, optional properties default
        let (Some(soc_raw), Some(ph_raw)) = (soc[idx], ph[idx]) else {
            report.missing_required_rows += 1;
            keep.push(false);
            continue;
        };

        let moisture_pct = match moisture[idx] {
            Some(raw) => moisture_to_percent(raw),
            None => {
                report.moisture_defaulted += 1;
                config.defaults.moisture_pct
            }
        };
        let temperature_celsius = match temperature[idx] {
            Some(raw) => kelvin_to_celsius(raw),
            None => {
                report.temperature_defaulted += 1;
                config.defaults.temperature_celsius
            }
        };

        let inputs = SoilInputs {
            moisture_pct,
            soc_pct: soc_to_percent(soc_raw),
            ph: ph_raw,
            temperature_celsius,
        };

        // STEP 4: Score; validation failures are per-row
        match score_soil(&inputs, config) {
            Ok(result) => {
                *report.grade_counts.entry(result.grade).or_insert(0) += 1;
                report.scored_rows += 1;
                results.push(&result);
                keep.push(true);
            }
            Err(err) => {
                debug!("Skipping row {}: {}", offset + idx, err);
                report.out_of_range_rows += 1;
                keep.push(false);
            }
        }
    }

    // STEP 5: Attach results to surviving rows
    let mask: BooleanChunked = keep.into_iter().collect();
    let kept = chunk.filter(&mask)?;
    Ok(kept.hstack(&results.into_columns())?)
}

/// Per-row value of one property, averaging surface and subsurface layers
fn property_values(chunk: &DataFrame, columns: &PropertyColumns) -> Result<Vec<Option<f64>>> {
    let surface = columns
        .surface
        .as_deref()
        .map(|name| float_values(chunk, name))
        .transpose()?;
    let subsurface = columns
        .subsurface
        .as_deref()
        .map(|name| float_values(chunk, name))
        .transpose()?;

    let at = |values: &Option<Vec<Option<f64>>>, idx: usize| values.as_ref().and_then(|v| v[idx]);

    Ok((0..chunk.height())
        .map(|idx| layer_mean(at(&surface, idx), at(&subsurface, idx)))
        .collect())
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?;

    Ok(column
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| !v.is_nan()))
        .collect())
}

fn layer_mean(surface: Option<f64>, subsurface: Option<f64>) -> Option<f64> {
    match (surface, subsurface) {
        (Some(a), Some(b)) => Some((a + b) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}

/// Column-wise accumulator for scored rows
#[derive(Default)]
struct ResultColumns {
    inputs: [Vec<f64>; 4],
    ratings: [Vec<&'static str>; 4],
    scores: [Vec<i32>; 4],
    weighted: [Vec<f64>; 4],
    quality: Vec<f64>,
    suitability: Vec<f64>,
    grade: Vec<&'static str>,
    color: Vec<String>,
    recommendation: Vec<String>,
}

impl ResultColumns {
    fn push(&mut self, result: &SuitabilityResult) {
        for (i, assessment) in result.assessments.iter().enumerate() {
            self.inputs[i].push(assessment.value);
            self.ratings[i].push(assessment.rating.label());
            self.scores[i].push(i32::from(assessment.score()));
            self.weighted[i].push(assessment.weighted_score);
        }
        self.quality.push(result.soil_quality_index);
        self.suitability.push(result.biochar_suitability_score);
        self.grade.push(result.grade.label());
        self.color.push(result.color_hex.clone());
        self.recommendation.push(result.recommendation.clone());
    }

    fn into_columns(self) -> Vec<Column> {
        let mut columns = Vec::with_capacity(21);

        for (name, values) in INPUT_COLUMNS.iter().zip(self.inputs) {
            columns.push(Column::new((*name).into(), values));
        }
        for (property, values) in SoilProperty::ALL.iter().zip(self.ratings) {
            columns.push(Column::new(format!("property_ratings_{}", property.key()).into(), values));
        }
        for (property, values) in SoilProperty::ALL.iter().zip(self.scores) {
            columns.push(Column::new(format!("property_scores_{}", property.key()).into(), values));
        }
        for (property, values) in SoilProperty::ALL.iter().zip(self.weighted) {
            columns.push(Column::new(format!("weighted_scores_{}", property.key()).into(), values));
        }

        columns.push(Column::new(SOIL_QUALITY_INDEX_COL.into(), self.quality));
        columns.push(Column::new(SUITABILITY_SCORE_COL.into(), self.suitability));
        columns.push(Column::new(GRADE_COL.into(), self.grade));
        columns.push(Column::new(COLOR_COL.into(), self.color));
        columns.push(Column::new(RECOMMENDATION_COL.into(), self.recommendation));
        columns
    }
}

fn log_summary(table: &DataFrame, report: &ScoringReport) -> Result<()> {
    info!(
        "Scored {}/{} rows ({} missing SOC/pH, {} out of range)",
        report.scored_rows,
        report.total_rows,
        report.missing_required_rows,
        report.out_of_range_rows
    );
    if report.moisture_defaulted > 0 || report.temperature_defaulted > 0 {
        info!(
            "Defaults applied: moisture {} rows, temperature {} rows",
            report.moisture_defaulted, report.temperature_defaulted
        );
    }

    if report.scored_rows == 0 {
        warn!("No rows could be scored");
        return Ok(());
    }

    let scores = table.column(SUITABILITY_SCORE_COL)?.f64()?;
    if let (Some(min), Some(max), Some(mean)) = (scores.min(), scores.max(), scores.mean()) {
        info!("Suitability score range {:.2}-{:.2}, mean {:.2}", min, max, mean);
    }
    for (grade, count) in &report.grade_counts {
        info!("  {}: {} rows", grade, count);
    }
    Ok(())
}
