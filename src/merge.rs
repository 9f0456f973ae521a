//! Table Merger
//!
//! Full outer join of per-raster point tables on rounded coordinates.
//!
//! Independently produced rasters that describe the same pixel grid rarely
//! agree to the last bit, so the join key is `(longitude, latitude)` scaled
//! by `10^precision` and rounded to an integer. The merged table holds the
//! union of all coordinates; a table that does not cover a coordinate
//! contributes nulls there.
//!
//! Column rules:
//! - the first table to bring a column name owns it; later copies are dropped
//! - `cell_id` is the exception: later tables fill rows where it is still null
//! - within one table the first row for a key wins
//!
//! Output columns: `longitude`, `latitude`, `cell_id` (when any input had
//! one), then value columns in first-seen order. Rows are sorted by
//! (latitude, longitude). Value columns keep their input dtypes.

use anyhow::{ensure, Context, Result};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::spatial::{CELL_ID_COL, LATITUDE_COL, LONGITUDE_COL};

/// Largest precision whose scaled coordinates still fit an `i64` key
pub const MAX_COORDINATE_PRECISION: u32 = 15;

const LON_KEY: &str = "__lon_key";
const LAT_KEY: &str = "__lat_key";
const CELL_ID_RIGHT: &str = "cell_id_right";

fn scaled_key(value: f64, scale: f64) -> Option<i64> {
    let scaled = (value * scale).round();
    (scaled.is_finite() && scaled.abs() < i64::MAX as f64).then_some(scaled as i64)
}

fn key_column(df: &DataFrame, source: &str, key: &str, scale: f64) -> Result<Column> {
    let values = df.column(source)?.cast(&DataType::Float64)?;
    let keys: Int64Chunked = values
        .f64()?
        .into_iter()
        .map(|v| v.and_then(|v| scaled_key(v, scale)))
        .collect();
    Ok(keys.with_name(key.into()).into_column())
}

/// Key one table and keep its first row per coordinate
///
/// Value columns already owned by an earlier table are left out here so the
/// join never produces suffixed copies of them.
fn keyed_frame(name: &str, df: &DataFrame, scale: f64, owned: &mut Vec<String>) -> Result<LazyFrame> {
    let lon_key = key_column(df, LONGITUDE_COL, LON_KEY, scale)?;
    let lat_key = key_column(df, LATITUDE_COL, LAT_KEY, scale)?;

    let unkeyed = (lon_key.is_null() | lat_key.is_null()).num_trues();
    if unkeyed > 0 {
        warn!("{}: {} rows without usable coordinates left out of the merge", name, unkeyed);
    }

    let mut columns = vec![lon_key, lat_key];
    let mut added = Vec::new();
    for column in df.get_columns() {
        let column_name = column.name().as_str();
        if column_name == LONGITUDE_COL || column_name == LATITUDE_COL {
            continue;
        }
        if column_name == CELL_ID_COL {
            columns.push(column.cast(&DataType::String)?);
        } else if owned.iter().any(|c| c == column_name) {
            debug!("{}: dropping duplicate column '{}'", name, column_name);
        } else {
            columns.push(column.clone());
            added.push(column_name.to_string());
        }
    }
    owned.extend(added);

    let keyed = DataFrame::new(columns)
        .with_context(|| format!("Failed to key table '{}'", name))?
        .lazy()
        .filter(col(LON_KEY).is_not_null().and(col(LAT_KEY).is_not_null()))
        .unique_stable(
            Some(vec![LON_KEY.into(), LAT_KEY.into()]),
            UniqueKeepStrategy::First,
        );
    Ok(keyed)
}

/// Merge named point tables into one wide table keyed by rounded coordinates
///
/// Tables without `longitude`/`latitude` columns, and empty tables, are
/// skipped with a warning. When nothing is left to merge the result is an
/// empty table rather than an error. Precisions above
/// [`MAX_COORDINATE_PRECISION`] are rejected.
pub fn merge_tables(tables: &[(String, DataFrame)], coordinate_precision: u32) -> Result<DataFrame> {
    ensure!(
        coordinate_precision <= MAX_COORDINATE_PRECISION,
        "Coordinate precision {} exceeds the maximum of {}",
        coordinate_precision,
        MAX_COORDINATE_PRECISION
    );
    let scale = 10f64.powi(coordinate_precision as i32);

    let mut merged: Option<LazyFrame> = None;
    let mut owned: Vec<String> = Vec::new();
    let mut has_cell_id = false;
    let mut merged_count = 0;

    for (name, df) in tables {
        if df.get_column_index(LONGITUDE_COL).is_none() || df.get_column_index(LATITUDE_COL).is_none() {
            warn!("Skipping {}: missing longitude/latitude columns", name);
            continue;
        }
        if df.height() == 0 {
            warn!("Skipping {}: table is empty", name);
            continue;
        }

        let keyed = keyed_frame(name, df, scale, &mut owned)
            .with_context(|| format!("Failed to merge table '{}'", name))?;
        let table_has_cell_id = df.get_column_index(CELL_ID_COL).is_some();

        merged = Some(match merged {
            None => keyed,
            Some(acc) => {
                let joined = acc.join(
                    keyed,
                    [col(LON_KEY), col(LAT_KEY)],
                    [col(LON_KEY), col(LAT_KEY)],
                    JoinArgs::new(JoinType::Full).with_coalesce(JoinCoalesce::CoalesceColumns),
                );
                if has_cell_id && table_has_cell_id {
                    // Earlier ids win, later tables only fill the gaps
                    joined
                        .with_column(
                            when(col(CELL_ID_COL).is_null())
                                .then(col(CELL_ID_RIGHT))
                                .otherwise(col(CELL_ID_COL))
                                .alias(CELL_ID_COL),
                        )
                        .drop([CELL_ID_RIGHT])
                } else {
                    joined
                }
            }
        });
        has_cell_id |= table_has_cell_id;
        merged_count += 1;
        debug!("Merged {}", name);
    }

    let Some(merged) = merged else {
        warn!("No valid tables to merge");
        return Ok(DataFrame::empty());
    };

    let mut output = vec![
        (col(LON_KEY).cast(DataType::Float64) / lit(scale)).alias(LONGITUDE_COL),
        (col(LAT_KEY).cast(DataType::Float64) / lit(scale)).alias(LATITUDE_COL),
    ];
    if has_cell_id {
        output.push(col(CELL_ID_COL));
    }
    output.extend(owned.iter().map(|name| col(name.as_str())));

    let merged = merged
        .sort([LAT_KEY, LON_KEY], SortMultipleOptions::default())
        .select(output)
        .collect()
        .context("Failed to assemble merged table")?;

    info!(
        "Merged {} tables into {} rows × {} columns",
        merged_count,
        merged.height(),
        merged.width()
    );
    Ok(merged)
}
