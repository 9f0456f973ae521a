//! Property rating bands
//!
//! Each soil property is rated on a four-step scale (Very Poor .. Good)
//! against nested, closed intervals: a value inside the Good interval is
//! Good, otherwise inside the Moderate interval is Moderate, and so on.
//! Everything outside the Poor interval (including NaN) is Very Poor.
//!
//! Default cut points:
//!
//! | property       | Good      | Moderate   | Poor      |
//! |----------------|-----------|------------|-----------|
//! | moisture %     | [50, 60]  | [30, 70]   | [20, 80]  |
//! | SOC %          | [4, ∞)    | [2, ∞)     | [1, ∞)    |
//! | pH             | [6, 7]    | [4.5, 8]   | [3, 9]    |
//! | temperature °C | [15, 25]  | [10, 30]   | [0, 35]   |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// The four soil properties that feed the quality index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoilProperty {
    Moisture,
    Soc,
    Ph,
    Temperature,
}

impl SoilProperty {
    pub const ALL: [SoilProperty; 4] = [
        SoilProperty::Moisture,
        SoilProperty::Soc,
        SoilProperty::Ph,
        SoilProperty::Temperature,
    ];

    /// Short key used in output column names (`property_scores_{key}`)
    pub fn key(self) -> &'static str {
        match self {
            SoilProperty::Moisture => "moisture",
            SoilProperty::Soc => "soc",
            SoilProperty::Ph => "ph",
            SoilProperty::Temperature => "temperature",
        }
    }

    /// Required properties exclude a row from scoring when missing;
    /// optional ones fall back to a default value.
    pub fn is_required(self) -> bool {
        matches!(self, SoilProperty::Soc | SoilProperty::Ph)
    }
}

impl fmt::Display for SoilProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SoilProperty::Moisture => "soil moisture",
            SoilProperty::Soc => "soil organic carbon",
            SoilProperty::Ph => "soil pH",
            SoilProperty::Temperature => "soil temperature",
        };
        f.write_str(name)
    }
}

/// Categorical rating of one property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "Very Poor")]
    VeryPoor,
    #[serde(rename = "Poor")]
    Poor,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Good")]
    Good,
}

impl Rating {
    pub fn label(self) -> &'static str {
        match self {
            Rating::VeryPoor => "Very Poor",
            Rating::Poor => "Poor",
            Rating::Moderate => "Moderate",
            Rating::Good => "Good",
        }
    }

    /// Integer score 0..=3
    pub fn score(self) -> u8 {
        match self {
            Rating::VeryPoor => 0,
            Rating::Poor => 1,
            Rating::Moderate => 2,
            Rating::Good => 3,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed interval `[lower, upper]`; `upper = None` means unbounded above
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl Interval {
    pub const fn closed(lower: f64, upper: f64) -> Self {
        Self { lower, upper: Some(upper) }
    }

    pub const fn at_least(lower: f64) -> Self {
        Self { lower, upper: None }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && self.upper.map_or(true, |upper| value <= upper)
    }

    fn upper_or_inf(&self) -> f64 {
        self.upper.unwrap_or(f64::INFINITY)
    }
}

/// Nested rating intervals for one property
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingBands {
    pub good: Interval,
    pub moderate: Interval,
    pub poor: Interval,
}

impl RatingBands {
    pub fn rate(&self, value: f64) -> Rating {
        if self.good.contains(value) {
            Rating::Good
        } else if self.moderate.contains(value) {
            Rating::Moderate
        } else if self.poor.contains(value) {
            Rating::Poor
        } else {
            Rating::VeryPoor
        }
    }

    /// Intervals must be well formed and nest Good ⊆ Moderate ⊆ Poor
    pub fn validate(&self, property: SoilProperty) -> Result<(), ConfigError> {
        let unordered = |detail: String| ConfigError::UnorderedBands { property, detail };

        for (name, interval) in [("good", &self.good), ("moderate", &self.moderate), ("poor", &self.poor)] {
            if interval.lower.is_nan() || interval.upper.is_some_and(f64::is_nan) {
                return Err(unordered(format!("{name} interval contains NaN")));
            }
            if interval.lower > interval.upper_or_inf() {
                return Err(unordered(format!(
                    "{name} lower bound {} exceeds upper bound {}",
                    interval.lower,
                    interval.upper_or_inf()
                )));
            }
        }

        let nested = |inner: &Interval, outer: &Interval| {
            outer.lower <= inner.lower && inner.upper_or_inf() <= outer.upper_or_inf()
        };
        if !nested(&self.good, &self.moderate) {
            return Err(unordered("good interval must lie inside moderate".to_string()));
        }
        if !nested(&self.moderate, &self.poor) {
            return Err(unordered("moderate interval must lie inside poor".to_string()));
        }

        Ok(())
    }

    pub fn default_for(property: SoilProperty) -> Self {
        match property {
            SoilProperty::Moisture => Self {
                good: Interval::closed(50.0, 60.0),
                moderate: Interval::closed(30.0, 70.0),
                poor: Interval::closed(20.0, 80.0),
            },
            SoilProperty::Soc => Self {
                good: Interval::at_least(4.0),
                moderate: Interval::at_least(2.0),
                poor: Interval::at_least(1.0),
            },
            SoilProperty::Ph => Self {
                good: Interval::closed(6.0, 7.0),
                moderate: Interval::closed(4.5, 8.0),
                poor: Interval::closed(3.0, 9.0),
            },
            SoilProperty::Temperature => Self {
                good: Interval::closed(15.0, 25.0),
                moderate: Interval::closed(10.0, 30.0),
                poor: Interval::closed(0.0, 35.0),
            },
        }
    }
}

/// Rating bands for all four properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyBands {
    pub moisture: RatingBands,
    pub soc: RatingBands,
    pub ph: RatingBands,
    pub temperature: RatingBands,
}

impl Default for PropertyBands {
    fn default() -> Self {
        Self {
            moisture: RatingBands::default_for(SoilProperty::Moisture),
            soc: RatingBands::default_for(SoilProperty::Soc),
            ph: RatingBands::default_for(SoilProperty::Ph),
            temperature: RatingBands::default_for(SoilProperty::Temperature),
        }
    }
}

impl PropertyBands {
    pub fn for_property(&self, property: SoilProperty) -> &RatingBands {
        match property {
            SoilProperty::Moisture => &self.moisture,
            SoilProperty::Soc => &self.soc,
            SoilProperty::Ph => &self.ph,
            SoilProperty::Temperature => &self.temperature,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for property in SoilProperty::ALL {
            self.for_property(property).validate(property)?;
        }
        Ok(())
    }
}

pub fn rate_moisture(moisture_pct: f64) -> Rating {
    RatingBands::default_for(SoilProperty::Moisture).rate(moisture_pct)
}

pub fn rate_soc(soc_pct: f64) -> Rating {
    RatingBands::default_for(SoilProperty::Soc).rate(soc_pct)
}

pub fn rate_ph(ph: f64) -> Rating {
    RatingBands::default_for(SoilProperty::Ph).rate(ph)
}

pub fn rate_temperature(temperature_celsius: f64) -> Rating {
    RatingBands::default_for(SoilProperty::Temperature).rate(temperature_celsius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moisture_band_edges() {
        assert_eq!(rate_moisture(19.99), Rating::VeryPoor);
        assert_eq!(rate_moisture(20.0), Rating::Poor);
        assert_eq!(rate_moisture(29.99), Rating::Poor);
        assert_eq!(rate_moisture(30.0), Rating::Moderate);
        assert_eq!(rate_moisture(49.99), Rating::Moderate);
        assert_eq!(rate_moisture(50.0), Rating::Good);
        assert_eq!(rate_moisture(60.0), Rating::Good);
        assert_eq!(rate_moisture(60.01), Rating::Moderate);
        assert_eq!(rate_moisture(70.0), Rating::Moderate);
        assert_eq!(rate_moisture(70.01), Rating::Poor);
        assert_eq!(rate_moisture(80.0), Rating::Poor);
        assert_eq!(rate_moisture(80.01), Rating::VeryPoor);
    }

    #[test]
    fn test_soc_band_edges() {
        assert_eq!(rate_soc(0.0), Rating::VeryPoor);
        assert_eq!(rate_soc(0.99), Rating::VeryPoor);
        assert_eq!(rate_soc(1.0), Rating::Poor);
        assert_eq!(rate_soc(2.0), Rating::Moderate);
        assert_eq!(rate_soc(3.99), Rating::Moderate);
        assert_eq!(rate_soc(4.0), Rating::Good);
        assert_eq!(rate_soc(40.0), Rating::Good);
    }

    #[test]
    fn test_ph_band_edges() {
        assert_eq!(rate_ph(2.99), Rating::VeryPoor);
        assert_eq!(rate_ph(3.0), Rating::Poor);
        assert_eq!(rate_ph(4.49), Rating::Poor);
        assert_eq!(rate_ph(4.5), Rating::Moderate);
        assert_eq!(rate_ph(6.0), Rating::Good);
        assert_eq!(rate_ph(7.0), Rating::Good);
        assert_eq!(rate_ph(7.01), Rating::Moderate);
        assert_eq!(rate_ph(8.0), Rating::Moderate);
        assert_eq!(rate_ph(8.01), Rating::Poor);
        assert_eq!(rate_ph(9.0), Rating::Poor);
        assert_eq!(rate_ph(9.01), Rating::VeryPoor);
    }

    #[test]
    fn test_temperature_band_edges() {
        assert_eq!(rate_temperature(-0.01), Rating::VeryPoor);
        assert_eq!(rate_temperature(0.0), Rating::Poor);
        assert_eq!(rate_temperature(10.0), Rating::Moderate);
        assert_eq!(rate_temperature(15.0), Rating::Good);
        assert_eq!(rate_temperature(25.0), Rating::Good);
        assert_eq!(rate_temperature(30.0), Rating::Moderate);
        assert_eq!(rate_temperature(32.0), Rating::Poor);
        assert_eq!(rate_temperature(35.0), Rating::Poor);
        assert_eq!(rate_temperature(35.01), Rating::VeryPoor);
    }

    #[test]
    fn test_nan_rates_very_poor() {
        assert_eq!(rate_ph(f64::NAN), Rating::VeryPoor);
        assert_eq!(rate_soc(f64::NAN), Rating::VeryPoor);
    }

    #[test]
    fn test_rating_scores_and_labels() {
        assert_eq!(Rating::VeryPoor.score(), 0);
        assert_eq!(Rating::Good.score(), 3);
        assert_eq!(Rating::Moderate.label(), "Moderate");
        assert_eq!(serde_json::to_string(&Rating::VeryPoor).unwrap(), "\"Very Poor\"");
    }

    #[test]
    fn test_default_bands_validate() {
        PropertyBands::default().validate().unwrap();
    }

    #[test]
    fn test_non_nested_bands_rejected() {
        let mut bands = PropertyBands::default();
        bands.ph.good = Interval::closed(6.0, 8.5);

        let err = bands.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnorderedBands { property: SoilProperty::Ph, .. }));
    }

    #[test]
    fn test_inverted_interval_rejected() {
        let mut bands = PropertyBands::default();
        bands.temperature.poor = Interval::closed(35.0, 0.0);
        assert!(bands.validate().is_err());
    }
}
