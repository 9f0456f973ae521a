//! Spatial indexing and area-of-interest handling

pub mod area;
pub mod cell_indexer;

pub use area::{is_within_mato_grosso, AreaOfInterest, GeoBounds, MATO_GROSSO_BOUNDS};
pub use cell_indexer::{
    cell_boundary, index, index_table, index_tables, is_valid_coordinate, IndexedTable,
};

pub const LONGITUDE_COL: &str = "longitude";
pub const LATITUDE_COL: &str = "latitude";
pub const CELL_ID_COL: &str = "cell_id";

/// Finest grid level supported by H3
pub const MAX_RESOLUTION: u8 = 15;

/// Default resolution for a circular area around a point
pub const DEFAULT_RESOLUTION: u8 = 7;

/// Coarser resolution used when the whole state is analysed
pub const FULL_STATE_RESOLUTION: u8 = 5;
