//! Suitability grades
//!
//! Maps a biochar suitability score (0-100) to a grade, a display color and
//! a recommendation. The table is data: colors and wording may be overridden
//! from a config file, the grade set itself is fixed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SuitabilityGrade {
    #[serde(rename = "High Suitability")]
    High,
    #[serde(rename = "Moderate Suitability")]
    Moderate,
    #[serde(rename = "Low Suitability")]
    Low,
    #[serde(rename = "Not Suitable")]
    NotSuitable,
}

impl SuitabilityGrade {
    pub fn label(self) -> &'static str {
        match self {
            SuitabilityGrade::High => "High Suitability",
            SuitabilityGrade::Moderate => "Moderate Suitability",
            SuitabilityGrade::Low => "Low Suitability",
            SuitabilityGrade::NotSuitable => "Not Suitable",
        }
    }
}

impl fmt::Display for SuitabilityGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the grade table: scores `>= min_score` (and below the previous
/// row's minimum) receive this grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub grade: SuitabilityGrade,
    pub min_score: f64,
    pub color_hex: String,
    pub recommendation: String,
}

/// Grade bands ordered by descending `min_score`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeTable {
    bands: Vec<GradeBand>,
}

impl Default for GradeTable {
    fn default() -> Self {
        let band = |grade, min_score, color_hex: &str, recommendation: &str| GradeBand {
            grade,
            min_score,
            color_hex: color_hex.to_string(),
            recommendation: recommendation.to_string(),
        };

        Self {
            bands: vec![
                band(SuitabilityGrade::High, 76.0, "#d32f2f", "Very suitable – biochar highly recommended"),
                band(SuitabilityGrade::Moderate, 51.0, "#f57c00", "Suitable – biochar recommended"),
                band(SuitabilityGrade::Low, 26.0, "#fbc02d", "Marginal – biochar may help"),
                band(SuitabilityGrade::NotSuitable, 0.0, "#388e3c", "Healthy soil – biochar not needed"),
            ],
        }
    }
}

impl GradeTable {
    pub fn new(bands: Vec<GradeBand>) -> Result<Self, ConfigError> {
        let table = Self { bands };
        table.validate()?;
        Ok(table)
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    /// Band for a suitability score. Scores below every minimum fall into the
    /// last band, which validation pins at or below zero.
    pub fn grade_for(&self, suitability_score: f64) -> &GradeBand {
        self.bands
            .iter()
            .find(|band| suitability_score >= band.min_score)
            .unwrap_or_else(|| &self.bands[self.bands.len() - 1])
    }

    pub fn band(&self, grade: SuitabilityGrade) -> Option<&GradeBand> {
        self.bands.iter().find(|band| band.grade == grade)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(last) = self.bands.last() else {
            return Err(ConfigError::InvalidGradeTable("table has no bands".to_string()));
        };
        if last.min_score > 0.0 {
            return Err(ConfigError::InvalidGradeTable(format!(
                "lowest band '{}' starts at {} and leaves scores below it ungraded",
                last.grade, last.min_score
            )));
        }

        for pair in self.bands.windows(2) {
            if !(pair[0].min_score > pair[1].min_score) {
                return Err(ConfigError::InvalidGradeTable(format!(
                    "minimum scores must strictly decrease ('{}' at {} then '{}' at {})",
                    pair[0].grade, pair[0].min_score, pair[1].grade, pair[1].min_score
                )));
            }
        }

        for (i, band) in self.bands.iter().enumerate() {
            if self.bands[..i].iter().any(|earlier| earlier.grade == band.grade) {
                return Err(ConfigError::InvalidGradeTable(format!(
                    "grade '{}' listed twice",
                    band.grade
                )));
            }
        }

        Ok(())
    }
}
