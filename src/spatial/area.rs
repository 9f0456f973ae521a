//! Area of interest
//!
//! Either the whole of Mato Grosso or a circle around a point inside it.
//! The choice also fixes the default grid resolution: the full state is
//! sparse relative to its size, so it uses coarser cells.

use crate::error::AreaError;
use crate::spatial::cell_indexer::is_valid_coordinate;
use crate::spatial::{DEFAULT_RESOLUTION, FULL_STATE_RESOLUTION};

/// Inclusive latitude/longitude box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Approximate state bounds (WGS84)
pub const MATO_GROSSO_BOUNDS: GeoBounds = GeoBounds {
    min_lat: -18.0,
    max_lat: -7.0,
    min_lon: -65.0,
    max_lon: -50.0,
};

pub const DEFAULT_RADIUS_KM: f64 = 100.0;
pub const MIN_RADIUS_KM: f64 = 1.0;
pub const MAX_RADIUS_KM: f64 = 500.0;

pub fn is_within_mato_grosso(lat: f64, lon: f64) -> bool {
    is_valid_coordinate(lat, lon) && MATO_GROSSO_BOUNDS.contains(lat, lon)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaOfInterest {
    FullState,
    Circle { lat: f64, lon: f64, radius_km: f64 },
}

impl AreaOfInterest {
    /// Circle around a point; the point must lie inside the state bounds and
    /// the radius within [`MIN_RADIUS_KM`, `MAX_RADIUS_KM`]
    pub fn circle(lat: f64, lon: f64, radius_km: f64) -> Result<Self, AreaError> {
        if !is_valid_coordinate(lat, lon) {
            return Err(AreaError::InvalidCoordinate { lat, lon });
        }
        if !MATO_GROSSO_BOUNDS.contains(lat, lon) {
            return Err(AreaError::OutsideStudyArea { lat, lon });
        }
        if !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&radius_km) {
            return Err(AreaError::InvalidRadius(radius_km));
        }
        Ok(Self::Circle { lat, lon, radius_km })
    }

    pub fn is_full_state(&self) -> bool {
        matches!(self, Self::FullState)
    }

    /// Grid resolution for this area: fixed for the full state, the
    /// caller's choice (default 7) for a circle
    pub fn resolution(&self, requested: Option<u8>) -> u8 {
        match self {
            Self::FullState => FULL_STATE_RESOLUTION,
            Self::Circle { .. } => requested.unwrap_or(DEFAULT_RESOLUTION),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_bounds() {
        assert!(is_within_mato_grosso(-12.6819, -56.9211));
        assert!(is_within_mato_grosso(-18.0, -65.0));
        assert!(!is_within_mato_grosso(-6.9, -56.0));
        assert!(!is_within_mato_grosso(-23.5, -46.6));
        assert!(!is_within_mato_grosso(f64::NAN, -56.0));
    }

    #[test]
    fn test_circle_validation() {
        assert!(AreaOfInterest::circle(-12.68, -56.92, 100.0).is_ok());
        assert_eq!(
            AreaOfInterest::circle(-23.5, -46.6, 100.0),
            Err(AreaError::OutsideStudyArea { lat: -23.5, lon: -46.6 })
        );
        assert_eq!(
            AreaOfInterest::circle(120.0, -56.0, 100.0),
            Err(AreaError::InvalidCoordinate { lat: 120.0, lon: -56.0 })
        );
        assert!(matches!(
            AreaOfInterest::circle(-12.68, -56.92, 0.0),
            Err(AreaError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_radius_bounds() {
        assert!(AreaOfInterest::circle(-12.68, -56.92, MIN_RADIUS_KM).is_ok());
        assert!(AreaOfInterest::circle(-12.68, -56.92, MAX_RADIUS_KM).is_ok());

        for radius in [0.5, 500.5, 10_000.0, -5.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(
                    AreaOfInterest::circle(-12.68, -56.92, radius),
                    Err(AreaError::InvalidRadius(_))
                ),
                "radius {} accepted",
                radius
            );
        }
    }

    #[test]
    fn test_resolution_choice() {
        assert_eq!(AreaOfInterest::FullState.resolution(Some(9)), 5);

        let circle = AreaOfInterest::circle(-12.68, -56.92, DEFAULT_RADIUS_KM).unwrap();
        assert_eq!(circle.resolution(None), 7);
        assert_eq!(circle.resolution(Some(8)), 8);
    }
}
