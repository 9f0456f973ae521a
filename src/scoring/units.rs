//! Unit converters: raw raster units to canonical scoring units.
//!
//! NaN in, NaN out. Defaulting of missing values happens before conversion,
//! never here.

const KELVIN_OFFSET: f64 = 273.15;

/// Volumetric fraction (m³/m³) to percent
pub fn moisture_to_percent(volumetric_fraction: f64) -> f64 {
    volumetric_fraction * 100.0
}

/// g/kg to percent
pub fn soc_to_percent(soc_g_per_kg: f64) -> f64 {
    soc_g_per_kg / 10.0
}

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}
