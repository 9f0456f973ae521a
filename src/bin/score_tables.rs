//! Score a directory of raster point tables
//!
//! Configuration comes from environment variables:
//! - `DATA_DIR`: directory of input CSV tables (default `data/processed`)
//! - `OUTPUT_DIR`: where results are written (default `data/outputs`)
//! - `SCORING_CONFIG`: optional JSON file overriding scoring defaults
//! - `AOI_LAT`, `AOI_LON`, `AOI_RADIUS_KM`: circular area of interest;
//!   without coordinates the whole state is analysed
//! - `H3_RESOLUTION`: grid resolution for a circular area (default 7)
//! - `RUST_LOG`: log filter

use anyhow::{Context, Result};
use residual_carbon::spatial::area::DEFAULT_RADIUS_KM;
use residual_carbon::{
    cache_key, write_csv, AreaOfInterest, CacheParams, CsvDirectory, FileFingerprint, PipelineConfig,
    ScoringConfig, SuitabilityPipeline, TableSource,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn env_f64(name: &str) -> Result<Option<f64>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} is not a number: '{}'", name, value)),
        Err(_) => Ok(None),
    }
}

fn area_from_env() -> Result<AreaOfInterest> {
    match (env_f64("AOI_LAT")?, env_f64("AOI_LON")?) {
        (Some(lat), Some(lon)) => {
            let radius_km = env_f64("AOI_RADIUS_KM")?.unwrap_or(DEFAULT_RADIUS_KM);
            Ok(AreaOfInterest::circle(lat, lon, radius_km)?)
        }
        (None, None) => Ok(AreaOfInterest::FullState),
        _ => anyhow::bail!("AOI_LAT and AOI_LON must be set together"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "residual_carbon=info,score_tables=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data/processed".to_string()));
    let output_dir = PathBuf::from(std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "data/outputs".to_string()));
    let requested_resolution: Option<u8> = match std::env::var("H3_RESOLUTION") {
        Ok(value) => Some(
            value
                .trim()
                .parse()
                .with_context(|| format!("H3_RESOLUTION is not an integer: '{}'", value))?,
        ),
        Err(_) => None,
    };

    let scoring = match std::env::var("SCORING_CONFIG") {
        Ok(path) => ScoringConfig::load(Path::new(&path))?,
        Err(_) => ScoringConfig::default(),
    };

    let area = area_from_env()?;
    let config = PipelineConfig {
        resolution: area.resolution(requested_resolution),
        scoring,
        ..Default::default()
    };

    tracing::info!("Configuration:");
    tracing::info!("  DATA_DIR: {}", data_dir.display());
    tracing::info!("  OUTPUT_DIR: {}", output_dir.display());
    tracing::info!("  Area: {:?}", area);
    tracing::info!("  H3 resolution: {}", config.resolution);

    let source = CsvDirectory::new(&data_dir);
    let fingerprints = source
        .files()?
        .iter()
        .map(|path| FileFingerprint::from_path(path))
        .collect::<Result<Vec<_>>>()?;
    let key = cache_key(
        &CacheParams {
            area,
            resolution: config.resolution,
            coordinate_precision: config.coordinate_precision,
        },
        &fingerprints,
    );
    tracing::info!("  Cache key: {}", key);

    let tables = source.point_tables()?;
    let pipeline = SuitabilityPipeline::new(config)?;

    let Some(output) = pipeline.run(&tables)? else {
        tracing::warn!("No usable input tables in {}; nothing written", data_dir.display());
        return Ok(());
    };

    write_csv(&output.merged, &output_dir.join("suitability_merged_points.csv"))?;
    write_csv(&output.scored, &output_dir.join("suitability_scores.csv"))?;

    let report = &output.report;
    tracing::info!(
        "Done: {} hexagons scored, {} skipped ({} missing SOC/pH, {} out of range)",
        report.scored_rows,
        report.invalid_rows(),
        report.missing_required_rows,
        report.out_of_range_rows
    );
    Ok(())
}
