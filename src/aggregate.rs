//! Hexagon Aggregator
//!
//! Collapses an indexed point table to one row per `cell_id`:
//! mean of every numeric column (nulls and NaN ignored), plus
//! `point_count`, plus an optional `boundary` polygon.
//!
//! Boundaries are computed after grouping, on the distinct cell ids only.
//! A state-wide run has ~10^5 points but only ~10^3 hexagons.

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::spatial::{cell_boundary, CELL_ID_COL};

pub const POINT_COUNT_COL: &str = "point_count";
pub const BOUNDARY_COL: &str = "boundary";

/// Aggregate an indexed table by hexagon
///
/// Without a `cell_id` column the table is returned unchanged so callers can
/// fall back to per-point scoring.
pub fn aggregate_by_cell(df: &DataFrame, attach_boundaries: bool) -> Result<DataFrame> {
    if df.get_column_index(CELL_ID_COL).is_none() {
        info!("No {} column; skipping hexagon aggregation", CELL_ID_COL);
        return Ok(df.clone());
    }

    // STEP 1: Coerce aggregatable columns to Float64
    let numeric = numeric_frame(df)?;
    let value_columns: Vec<String> = numeric
        .get_column_names_str()
        .into_iter()
        .filter(|name| *name != CELL_ID_COL)
        .map(str::to_string)
        .collect();

    // STEP 2: Group by cell: per-column mean + point count
    let mut aggregations: Vec<Expr> = value_columns.iter().map(|name| col(name.as_str()).mean()).collect();
    aggregations.push(len().cast(DataType::Int64).alias(POINT_COUNT_COL));

    let mut hexagons = numeric
        .lazy()
        .group_by([col(CELL_ID_COL)])
        .agg(aggregations)
        .sort([CELL_ID_COL], SortMultipleOptions::default())
        .collect()
        .context("Failed to aggregate points by cell")?;

    // STEP 3: Boundaries for the distinct cells only
    if attach_boundaries {
        let boundaries = boundary_column(&hexagons)?;
        hexagons.with_column(boundaries)?;
    }

    let points = df.height();
    let cells = hexagons.height();
    info!(
        "Aggregated {} points into {} hexagons (avg {:.1} points per hexagon)",
        points,
        cells,
        if cells > 0 { points as f64 / cells as f64 } else { 0.0 }
    );

    Ok(hexagons)
}

/// `cell_id` plus every column that survives numeric coercion, NaN as null
fn numeric_frame(df: &DataFrame) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());
    let mut excluded = Vec::new();

    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == CELL_ID_COL {
            columns.push(column.cast(&DataType::String)?);
            continue;
        }
        if name == POINT_COUNT_COL || name == BOUNDARY_COL {
            continue;
        }

        let coerced = if column.dtype().is_primitive_numeric() {
            column.cast(&DataType::Float64)
        } else {
            column.strict_cast(&DataType::Float64)
        };
        match coerced {
            Ok(floats) => {
                let values: Float64Chunked = floats
                    .f64()?
                    .into_iter()
                    .map(|value| value.filter(|v| !v.is_nan()))
                    .collect();
                columns.push(values.with_name(name.into()).into_column());
            }
            Err(err) => {
                debug!("Column '{}' failed numeric coercion: {}", name, err);
                excluded.push(name.to_string());
            }
        }
    }

    if !excluded.is_empty() {
        warn!("Excluded non-numeric columns from aggregation: {:?}", excluded);
    }

    let frame = DataFrame::new(columns)?;

    // Rows without a cell cannot be grouped
    let has_cell = frame.column(CELL_ID_COL)?.is_not_null();
    let unassigned = frame.height() - has_cell.num_trues();
    if unassigned > 0 {
        warn!("Dropping {} rows without a {}", unassigned, CELL_ID_COL);
        return Ok(frame.filter(&has_cell)?);
    }
    Ok(frame)
}

/// Hexagon polygons as JSON arrays of `[lon, lat]` pairs
fn boundary_column(hexagons: &DataFrame) -> Result<Column> {
    let cell_ids = hexagons.column(CELL_ID_COL)?.str()?;
    let mut invalid = 0usize;

    let boundaries: Vec<Option<String>> = cell_ids
        .into_iter()
        .map(|cell_id| {
            let vertices = cell_id.and_then(|id| match cell_boundary(id) {
                Ok(vertices) => Some(vertices),
                Err(err) => {
                    debug!("{}", err);
                    invalid += 1;
                    None
                }
            })?;
            let pairs: Vec<[f64; 2]> = vertices.into_iter().map(|(lon, lat)| [lon, lat]).collect();
            serde_json::to_string(&pairs).ok()
        })
        .collect();

    if invalid > 0 {
        warn!("{} cell ids are not valid H3 cells; their boundary is null", invalid);
    }

    Ok(Column::new(BOUNDARY_COL.into(), boundaries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::index;
    use approx::assert_relative_eq;

    fn indexed_points() -> DataFrame {
        let a = index(-12.0, -56.0, 5).unwrap();
        let b = index(-15.0, -55.0, 5).unwrap();
        df! {
            "longitude" => [-56.0, -56.0001, -56.0002, -55.0],
            "latitude" => [-12.0, -12.0001, -12.0002, -15.0],
            "cell_id" => [a.clone(), a.clone(), a, b],
            "soc_b0" => [Some(10.0), Some(20.0), None, Some(40.0)],
            "ph_b0" => [6.0, f64::NAN, 7.0, 5.0],
            "color" => ["#fff", "#000", "#fff", "#000"],
        }
        .unwrap()
    }

    #[test]
    fn test_means_ignore_missing_values() {
        let hexagons = aggregate_by_cell(&indexed_points(), false).unwrap();
        assert_eq!(hexagons.height(), 2);

        let first_cell = index(-12.0, -56.0, 5).unwrap();
        let mask = hexagons.column("cell_id").unwrap().str().unwrap().equal(first_cell.as_str());
        let row = hexagons.filter(&mask).unwrap();

        let soc = row.column("soc_b0").unwrap().f64().unwrap().get(0).unwrap();
        let ph = row.column("ph_b0").unwrap().f64().unwrap().get(0).unwrap();
        assert_relative_eq!(soc, 15.0);
        assert_relative_eq!(ph, 6.5);
        let count = row.column("point_count").unwrap().i64().unwrap().get(0).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_point_count_conserved() {
        let points = indexed_points();
        let hexagons = aggregate_by_cell(&points, false).unwrap();

        let total: i64 = hexagons.column("point_count").unwrap().i64().unwrap().into_no_null_iter().sum();
        assert_eq!(total as usize, points.height());
    }

    #[test]
    fn test_non_numeric_columns_excluded() {
        let hexagons = aggregate_by_cell(&indexed_points(), false).unwrap();
        assert!(hexagons.column("color").is_err());
        assert!(hexagons.column("longitude").is_ok());
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let cell = index(-12.0, -56.0, 5).unwrap();
        let df = df! {
            "cell_id" => [cell.clone(), cell],
            "moisture" => ["0.2", "0.4"],
        }
        .unwrap();

        let hexagons = aggregate_by_cell(&df, false).unwrap();
        let moisture = hexagons.column("moisture").unwrap().f64().unwrap().get(0).unwrap();
        assert_relative_eq!(moisture, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_boundaries_attached_after_grouping() {
        let hexagons = aggregate_by_cell(&indexed_points(), true).unwrap();
        let boundaries = hexagons.column("boundary").unwrap().str().unwrap();

        for (cell_id, boundary) in hexagons
            .column("cell_id")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .zip(boundaries.into_no_null_iter())
        {
            let pairs: Vec<[f64; 2]> = serde_json::from_str(boundary).unwrap();
            let expected: Vec<[f64; 2]> = cell_boundary(cell_id)
                .unwrap()
                .into_iter()
                .map(|(lon, lat)| [lon, lat])
                .collect();
            assert_eq!(pairs, expected);
        }
    }

    #[test]
    fn test_passthrough_without_cell_id() {
        let df = df! {
            "longitude" => [-56.0],
            "latitude" => [-12.0],
            "soc_b0" => [10.0],
        }
        .unwrap();

        let result = aggregate_by_cell(&df, true).unwrap();
        assert!(result.equals(&df));
    }

    #[test]
    fn test_reaggregation_ignores_existing_counts() {
        let once = aggregate_by_cell(&indexed_points(), true).unwrap();
        let twice = aggregate_by_cell(&once, true).unwrap();

        let counts: Vec<i64> = twice.column("point_count").unwrap().i64().unwrap().into_no_null_iter().collect();
        assert_eq!(counts, vec![1, 1]);
    }
}
