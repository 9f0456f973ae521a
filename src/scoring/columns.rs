//! Property column discovery
//!
//! Source rasters name their value columns freely (for example
//! `SOC_res_250_b0 (g/kg)` or `soil_temperature_level_1`), so the scorer
//! locates each property by case-insensitive substring match against an
//! ordered pattern list. Columns are scanned in table order; the first
//! column matching any pattern wins. When depth-layer variants exist
//! (`_b0` surface, `_b10` subsurface) both are returned so the caller can
//! average them row by row.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scoring::batch::is_scoring_output_column;
use crate::scoring::SoilProperty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnPatterns {
    pub moisture: Vec<String>,
    pub soc: Vec<String>,
    pub ph: Vec<String>,
    pub temperature: Vec<String>,
    /// A column whose lowercased name contains any of these is never a property
    pub excluded_substrings: Vec<String>,
    /// Coordinate and index columns, compared case-insensitively
    pub excluded_columns: Vec<String>,
    pub surface_tag: String,
    pub subsurface_tag: String,
}

impl Default for ColumnPatterns {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            moisture: strings(&["moisture", "sm_surface"]),
            soc: strings(&["soc", "soil_organic_carbon", "soil_organic"]),
            ph: strings(&["ph", "soil_ph"]),
            temperature: strings(&["temp", "temperature", "soil_temp", "soil_temperature"]),
            excluded_substrings: strings(&["score"]),
            excluded_columns: strings(&[
                "longitude",
                "latitude",
                "lon",
                "lat",
                "cell_id",
                "h3_index",
                "point_count",
                "boundary",
            ]),
            surface_tag: "_b0".to_string(),
            subsurface_tag: "_b10".to_string(),
        }
    }
}

impl ColumnPatterns {
    pub fn for_property(&self, property: SoilProperty) -> &[String] {
        match property {
            SoilProperty::Moisture => &self.moisture,
            SoilProperty::Soc => &self.soc,
            SoilProperty::Ph => &self.ph,
            SoilProperty::Temperature => &self.temperature,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for property in SoilProperty::ALL {
            let patterns = self.for_property(property);
            if patterns.is_empty() || patterns.iter().any(|p| p.is_empty()) {
                return Err(ConfigError::EmptyPatterns(property));
            }
        }
        Ok(())
    }

    fn is_excluded(&self, lowered: &str) -> bool {
        self.excluded_substrings
            .iter()
            .any(|s| lowered.contains(&s.to_lowercase()))
            || self
                .excluded_columns
                .iter()
                .any(|c| c.to_lowercase() == lowered)
            || is_scoring_output_column(lowered)
    }
}

/// Columns that hold one property
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyColumns {
    /// Surface layer, or the only column when no depth tag is present
    pub surface: Option<String>,
    pub subsurface: Option<String>,
}

impl PropertyColumns {
    pub fn is_empty(&self) -> bool {
        self.surface.is_none() && self.subsurface.is_none()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.surface.iter().chain(self.subsurface.iter()).map(String::as_str)
    }
}

/// Discovered columns for all four properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredColumns {
    pub moisture: PropertyColumns,
    pub soc: PropertyColumns,
    pub ph: PropertyColumns,
    pub temperature: PropertyColumns,
}

impl DiscoveredColumns {
    pub fn get(&self, property: SoilProperty) -> &PropertyColumns {
        match property {
            SoilProperty::Moisture => &self.moisture,
            SoilProperty::Soc => &self.soc,
            SoilProperty::Ph => &self.ph,
            SoilProperty::Temperature => &self.temperature,
        }
    }

    fn get_mut(&mut self, property: SoilProperty) -> &mut PropertyColumns {
        match property {
            SoilProperty::Moisture => &mut self.moisture,
            SoilProperty::Soc => &mut self.soc,
            SoilProperty::Ph => &mut self.ph,
            SoilProperty::Temperature => &mut self.temperature,
        }
    }
}

/// Locate one property's columns in `df`
pub fn find_property_columns(
    df: &DataFrame,
    property: SoilProperty,
    patterns: &ColumnPatterns,
) -> PropertyColumns {
    let needles: Vec<String> = patterns
        .for_property(property)
        .iter()
        .map(|p| p.to_lowercase())
        .collect();
    let surface_tag = patterns.surface_tag.to_lowercase();
    let subsurface_tag = patterns.subsurface_tag.to_lowercase();

    let mut surface = None;
    let mut subsurface = None;
    let mut untagged = None;

    for column in df.get_columns() {
        if !column.dtype().is_primitive_numeric() {
            continue;
        }
        let name = column.name().as_str();
        let lowered = name.to_lowercase();
        if patterns.is_excluded(&lowered) || !needles.iter().any(|n| lowered.contains(n.as_str())) {
            continue;
        }

        if lowered.contains(&subsurface_tag) {
            subsurface.get_or_insert_with(|| name.to_string());
        } else if lowered.contains(&surface_tag) {
            surface.get_or_insert_with(|| name.to_string());
        } else {
            untagged.get_or_insert_with(|| name.to_string());
        }
    }

    if surface.is_some() || subsurface.is_some() {
        PropertyColumns { surface, subsurface }
    } else {
        PropertyColumns {
            surface: untagged,
            subsurface: None,
        }
    }
}

/// Locate all four properties
pub fn discover_columns(df: &DataFrame, patterns: &ColumnPatterns) -> DiscoveredColumns {
    let mut discovered = DiscoveredColumns::default();
    for property in SoilProperty::ALL {
        *discovered.get_mut(property) = find_property_columns(df, property, patterns);
    }
    discovered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soil_table() -> DataFrame {
        df! {
            "longitude" => [-55.0, -55.1],
            "latitude" => [-12.0, -12.1],
            "cell_id" => ["87a8ec6a4ffffff", "87a8ec6a4ffffff"],
            "SOC_res_250_b0 (g/kg)" => [20.0, 30.0],
            "SOC_res_250_b10 (g/kg)" => [22.0, 28.0],
            "soil_pH_res_250_b0" => [5.5, 6.0],
            "SMAP_soil_moisture" => [0.3, 0.35],
            "soil_temperature_level_1" => [300.0, 298.0],
            "point_count" => [3.0, 3.0],
        }
        .unwrap()
    }

    #[test]
    fn test_discovers_depth_layers() {
        let found = discover_columns(&soil_table(), &ColumnPatterns::default());

        assert_eq!(found.soc.surface.as_deref(), Some("SOC_res_250_b0 (g/kg)"));
        assert_eq!(found.soc.subsurface.as_deref(), Some("SOC_res_250_b10 (g/kg)"));
        assert_eq!(found.ph.surface.as_deref(), Some("soil_pH_res_250_b0"));
        assert_eq!(found.ph.subsurface, None);
        assert_eq!(found.moisture.surface.as_deref(), Some("SMAP_soil_moisture"));
        assert_eq!(found.temperature.surface.as_deref(), Some("soil_temperature_level_1"));
    }

    #[test]
    fn test_excludes_score_and_coordinate_columns() {
        let df = df! {
            "lat" => [1.0],
            "ph_score" => [2.0],
            "property_scores_ph" => [3.0],
            "property_ratings_ph" => ["Good"],
        }
        .unwrap();

        let found = find_property_columns(&df, SoilProperty::Ph, &ColumnPatterns::default());
        assert!(found.is_empty());
    }

    #[test]
    fn test_first_match_in_table_order_wins() {
        let df = df! {
            "soil_temp_a" => [290.0],
            "temperature_b" => [291.0],
        }
        .unwrap();

        let found = find_property_columns(&df, SoilProperty::Temperature, &ColumnPatterns::default());
        assert_eq!(found.surface.as_deref(), Some("soil_temp_a"));
    }

    #[test]
    fn test_tagged_columns_preferred_over_untagged() {
        let df = df! {
            "soc_mean" => [10.0],
            "soc_b10" => [12.0],
        }
        .unwrap();

        let found = find_property_columns(&df, SoilProperty::Soc, &ColumnPatterns::default());
        assert_eq!(found.surface, None);
        assert_eq!(found.subsurface.as_deref(), Some("soc_b10"));
    }

    #[test]
    fn test_string_columns_ignored() {
        let df = df! {
            "ph_class" => ["acidic"],
            "ph_value" => [5.0],
        }
        .unwrap();

        let found = find_property_columns(&df, SoilProperty::Ph, &ColumnPatterns::default());
        assert_eq!(found.surface.as_deref(), Some("ph_value"));
    }

    #[test]
    fn test_custom_patterns() {
        let mut patterns = ColumnPatterns::default();
        patterns.moisture = vec!["vwc".to_string()];

        let df = df! { "VWC_surface" => [0.2] }.unwrap();
        let found = find_property_columns(&df, SoilProperty::Moisture, &patterns);
        assert_eq!(found.surface.as_deref(), Some("VWC_surface"));
    }

    #[test]
    fn test_empty_patterns_rejected() {
        let mut patterns = ColumnPatterns::default();
        patterns.ph.clear();
        assert!(matches!(patterns.validate(), Err(ConfigError::EmptyPatterns(SoilProperty::Ph))));
    }
}
