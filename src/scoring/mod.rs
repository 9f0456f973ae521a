//! Property Scorer
//!
//! Turns one set of canonical soil inputs into a soil quality index and its
//! complement, the biochar suitability score:
//!
//! 1. Validate ranges (moisture 0-100 %, SOC >= 0 %, pH 0-14, finite temperature)
//! 2. Rate each property against its bands (0..=3)
//! 3. Weighted sum / (3 × Σweights) × 100 = soil quality index (2 dp)
//! 4. Suitability = 100 − quality index (2 dp), so the two always sum to 100
//! 5. Grade, color and recommendation from the grade table
//!
//! Table-level application (column discovery, unit conversion, missing-value
//! policy, chunking) lives in [`batch`].

pub mod batch;
pub mod columns;
pub mod grading;
pub mod ratings;
pub mod units;

pub use batch::{score_table, ScoredTable, ScoringReport};
pub use columns::{discover_columns, find_property_columns, ColumnPatterns, DiscoveredColumns, PropertyColumns};
pub use grading::{GradeBand, GradeTable, SuitabilityGrade};
pub use ratings::{
    rate_moisture, rate_ph, rate_soc, rate_temperature, Interval, PropertyBands, Rating, RatingBands,
    SoilProperty,
};
pub use units::{kelvin_to_celsius, moisture_to_percent, soc_to_percent};

use crate::config::ScoringConfig;
use crate::error::ScoringError;

/// Soil inputs in canonical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoilInputs {
    pub moisture_pct: f64,
    pub soc_pct: f64,
    pub ph: f64,
    pub temperature_celsius: f64,
}

impl SoilInputs {
    pub fn value(&self, property: SoilProperty) -> f64 {
        match property {
            SoilProperty::Moisture => self.moisture_pct,
            SoilProperty::Soc => self.soc_pct,
            SoilProperty::Ph => self.ph,
            SoilProperty::Temperature => self.temperature_celsius,
        }
    }

    /// Range-check every input; NaN counts as missing
    pub fn validate(&self) -> Result<(), ScoringError> {
        for property in SoilProperty::ALL {
            let value = self.value(property);
            if value.is_nan() {
                return Err(ScoringError::MissingValue(property));
            }

            let (in_range, valid_range) = match property {
                SoilProperty::Moisture => ((0.0..=100.0).contains(&value), "[0, 100] %"),
                SoilProperty::Soc => (value >= 0.0 && value.is_finite(), ">= 0 %"),
                SoilProperty::Ph => ((0.0..=14.0).contains(&value), "[0, 14]"),
                SoilProperty::Temperature => (value.is_finite(), "finite °C"),
            };
            if !in_range {
                return Err(ScoringError::OutOfRange {
                    property,
                    value,
                    valid_range,
                });
            }
        }
        Ok(())
    }
}

/// Rating and weighted contribution of one property
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyAssessment {
    pub property: SoilProperty,
    pub value: f64,
    pub rating: Rating,
    pub weighted_score: f64,
}

impl PropertyAssessment {
    pub fn score(&self) -> u8 {
        self.rating.score()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuitabilityResult {
    pub inputs: SoilInputs,
    /// In `SoilProperty::ALL` order
    pub assessments: [PropertyAssessment; 4],
    pub total_weighted_score: f64,
    pub maximum_possible_score: f64,
    pub soil_quality_index: f64,
    pub biochar_suitability_score: f64,
    pub grade: SuitabilityGrade,
    pub color_hex: String,
    pub recommendation: String,
}

impl SuitabilityResult {
    pub fn assessment(&self, property: SoilProperty) -> &PropertyAssessment {
        match property {
            SoilProperty::Moisture => &self.assessments[0],
            SoilProperty::Soc => &self.assessments[1],
            SoilProperty::Ph => &self.assessments[2],
            SoilProperty::Temperature => &self.assessments[3],
        }
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score one location
pub fn score_soil(inputs: &SoilInputs, config: &ScoringConfig) -> Result<SuitabilityResult, ScoringError> {
    inputs.validate()?;

    let assessments = SoilProperty::ALL.map(|property| {
        let value = inputs.value(property);
        let rating = config.bands.for_property(property).rate(value);
        PropertyAssessment {
            property,
            value,
            rating,
            weighted_score: f64::from(rating.score()) * config.weights.weight(property),
        }
    });

    let total_weighted_score: f64 = assessments.iter().map(|a| a.weighted_score).sum();
    let maximum_possible_score = config.weights.maximum_possible_score();

    let soil_quality_index = round2(total_weighted_score / maximum_possible_score * 100.0);
    let biochar_suitability_score = round2(100.0 - soil_quality_index);

    let band = config.grades.grade_for(biochar_suitability_score);

    Ok(SuitabilityResult {
        inputs: *inputs,
        assessments,
        total_weighted_score,
        maximum_possible_score,
        soil_quality_index,
        biochar_suitability_score,
        grade: band.grade,
        color_hex: band.color_hex.clone(),
        recommendation: band.recommendation.clone(),
    })
}
