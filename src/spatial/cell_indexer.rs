//! Cell Indexer
//!
//! Maps (latitude, longitude) to H3 cell identifiers. Cell ids are the
//! lowercase hexadecimal form of the 64-bit H3 index, so they are stable
//! across runs and across tools that speak H3.

use h3o::{CellIndex, LatLng, Resolution};
use polars::prelude::*;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::IndexError;
use crate::spatial::{CELL_ID_COL, LATITUDE_COL, LONGITUDE_COL};

pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

pub(crate) fn resolution(value: u8) -> Result<Resolution, IndexError> {
    Resolution::try_from(value).map_err(|_| IndexError::InvalidResolution(i64::from(value)))
}

/// Cell identifier for one coordinate
///
/// Fails on NaN or out-of-range coordinates instead of clamping them.
pub fn index(lat: f64, lon: f64, resolution_level: u8) -> Result<String, IndexError> {
    let resolution = resolution(resolution_level)?;
    Ok(cell_at(lat, lon, resolution)?.to_string())
}

fn cell_at(lat: f64, lon: f64, resolution: Resolution) -> Result<CellIndex, IndexError> {
    if !is_valid_coordinate(lat, lon) {
        return Err(IndexError::InvalidCoordinate { lat, lon });
    }
    let point = LatLng::new(lat, lon).map_err(|_| IndexError::InvalidCoordinate { lat, lon })?;
    Ok(point.to_cell(resolution))
}

/// Polygon vertices of a cell as (longitude, latitude) pairs
pub fn cell_boundary(cell_id: &str) -> Result<Vec<(f64, f64)>, IndexError> {
    let cell = CellIndex::from_str(cell_id).map_err(|_| IndexError::InvalidCellId(cell_id.to_string()))?;
    Ok(cell.boundary().iter().map(|vertex| (vertex.lng(), vertex.lat())).collect())
}

/// Result of indexing one table
#[derive(Debug, Clone)]
pub struct IndexedTable {
    pub table: DataFrame,
    /// Rows removed for NaN or out-of-range coordinates
    pub dropped_rows: usize,
}

/// Add a `cell_id` column to a point table
///
/// Rows with missing or out-of-range coordinates are dropped before
/// indexing. An existing `cell_id` column is replaced. The input table is
/// left untouched.
pub fn index_table(df: &DataFrame, resolution_level: u8) -> Result<IndexedTable, IndexError> {
    let resolution = resolution(resolution_level)?;

    for name in [LONGITUDE_COL, LATITUDE_COL] {
        if df.get_column_index(name).is_none() {
            return Err(IndexError::MissingColumn(name.to_string()));
        }
    }
    if df.height() == 0 {
        return Err(IndexError::EmptyTable);
    }

    let lon_col = df.column(LONGITUDE_COL)?.cast(&DataType::Float64)?;
    let lat_col = df.column(LATITUDE_COL)?.cast(&DataType::Float64)?;
    let lons = lon_col.f64()?;
    let lats = lat_col.f64()?;

    let mask: BooleanChunked = lats
        .into_iter()
        .zip(lons.into_iter())
        .map(|(lat, lon)| matches!((lat, lon), (Some(lat), Some(lon)) if is_valid_coordinate(lat, lon)))
        .collect();

    let valid = df.filter(&mask)?;
    let dropped_rows = df.height() - valid.height();
    if valid.height() == 0 {
        return Err(IndexError::NoValidCoordinates);
    }
    if dropped_rows > 0 {
        debug!("Dropped {} rows with invalid coordinates", dropped_rows);
    }

    let lon_col = valid.column(LONGITUDE_COL)?.cast(&DataType::Float64)?;
    let lat_col = valid.column(LATITUDE_COL)?.cast(&DataType::Float64)?;
    let cell_ids = lat_col
        .f64()?
        .into_no_null_iter()
        .zip(lon_col.f64()?.into_no_null_iter())
        .map(|(lat, lon)| cell_at(lat, lon, resolution).map(|cell| cell.to_string()))
        .collect::<Result<Vec<String>, IndexError>>()?;

    let mut table = valid;
    table.with_column(Column::new(CELL_ID_COL.into(), cell_ids))?;

    Ok(IndexedTable { table, dropped_rows })
}

/// Index every named table, skipping the ones that cannot be indexed
///
/// An invalid resolution is a configuration error and aborts the whole
/// batch; a bad table is logged and left out of the result.
pub fn index_tables(
    tables: &[(String, DataFrame)],
    resolution_level: u8,
) -> Result<Vec<(String, DataFrame)>, IndexError> {
    resolution(resolution_level)?;

    let mut indexed = Vec::with_capacity(tables.len());
    for (name, df) in tables {
        match index_table(df, resolution_level) {
            Ok(result) => {
                info!(
                    "Indexed {}: {} rows at resolution {} ({} dropped)",
                    name,
                    result.table.height(),
                    resolution_level,
                    result.dropped_rows
                );
                indexed.push((name.clone(), result.table));
            }
            Err(err) => warn!("Skipping table {}: {}", name, err),
        }
    }

    Ok(indexed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_deterministic() {
        let first = index(-12.6819, -56.9211, 7).unwrap();
        let second = index(-12.6819, -56.9211, 7).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 15);
        assert!(CellIndex::from_str(&first).is_ok());
    }

    #[test]
    fn test_resolution_changes_cell() {
        let coarse = index(-12.6819, -56.9211, 5).unwrap();
        let fine = index(-12.6819, -56.9211, 7).unwrap();

        assert_ne!(coarse, fine);
        let fine_cell = CellIndex::from_str(&fine).unwrap();
        let parent = fine_cell.parent(Resolution::Five).unwrap();
        assert_eq!(parent.to_string(), coarse);
    }

    #[test]
    fn test_invalid_inputs_fail_fast() {
        assert!(matches!(index(91.0, 0.0, 7), Err(IndexError::InvalidCoordinate { .. })));
        assert!(matches!(index(0.0, -180.5, 7), Err(IndexError::InvalidCoordinate { .. })));
        assert!(matches!(index(f64::NAN, 0.0, 7), Err(IndexError::InvalidCoordinate { .. })));
        assert!(matches!(index(0.0, 0.0, 16), Err(IndexError::InvalidResolution(16))));
    }

    #[test]
    fn test_boundary_is_lon_lat_ordered() {
        let lat = -12.6819;
        let lon = -56.9211;
        let cell = index(lat, lon, 7).unwrap();
        let boundary = cell_boundary(&cell).unwrap();

        assert!(boundary.len() >= 6);
        for (vertex_lon, vertex_lat) in &boundary {
            // A resolution-7 hexagon spans roughly 1 km
            assert!((vertex_lon - lon).abs() < 0.1);
            assert!((vertex_lat - lat).abs() < 0.1);
        }
    }

    #[test]
    fn test_boundary_rejects_bad_id() {
        assert!(matches!(cell_boundary("not-a-cell"), Err(IndexError::InvalidCellId(_))));
    }

    #[test]
    fn test_index_table_drops_invalid_rows() {
        let df = df! {
            "longitude" => [Some(-56.0), Some(-56.1), None, Some(200.0)],
            "latitude" => [Some(-12.0), Some(-12.1), Some(-12.2), Some(-12.3)],
            "soc_b0" => [10.0, 11.0, 12.0, 13.0],
        }
        .unwrap();

        let result = index_table(&df, 7).unwrap();
        assert_eq!(result.table.height(), 2);
        assert_eq!(result.dropped_rows, 2);

        let ids = result.table.column("cell_id").unwrap().str().unwrap();
        assert_eq!(ids.get(0).unwrap(), index(-12.0, -56.0, 7).unwrap());
        // Input untouched
        assert_eq!(df.height(), 4);
        assert!(df.column("cell_id").is_err());
    }

    #[test]
    fn test_index_table_structural_failures() {
        let no_coords = df! { "value" => [1.0] }.unwrap();
        assert!(matches!(index_table(&no_coords, 7), Err(IndexError::MissingColumn(_))));

        let all_bad = df! {
            "longitude" => [f64::NAN],
            "latitude" => [95.0],
        }
        .unwrap();
        assert!(matches!(index_table(&all_bad, 7), Err(IndexError::NoValidCoordinates)));
    }

    #[test]
    fn test_index_tables_skips_bad_tables() {
        let good = df! {
            "longitude" => [-56.0],
            "latitude" => [-12.0],
            "ph_b0" => [6.0],
        }
        .unwrap();
        let bad = df! { "ph_b10" => [6.0] }.unwrap();

        let tables = vec![("ph_b0".to_string(), good), ("ph_b10".to_string(), bad)];
        let indexed = index_tables(&tables, 7).unwrap();

        assert_eq!(indexed.len(), 1);
        assert_eq!(indexed[0].0, "ph_b0");
        assert!(index_tables(&tables, 20).is_err());
    }
}
