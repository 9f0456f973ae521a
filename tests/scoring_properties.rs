//! Property tests for indexing and scoring invariants

use proptest::prelude::*;
use residual_carbon::scoring::{rate_moisture, rate_ph, rate_soc, rate_temperature, Rating};
use residual_carbon::{index, score_soil, ScoringConfig, SoilInputs};

const LABELS: [&str; 4] = ["Very Poor", "Poor", "Moderate", "Good"];

proptest! {
    #[test]
    fn index_is_deterministic(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0, res in 0u8..=15) {
        let first = index(lat, lon, res).unwrap();
        let second = index(lat, lon, res).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn out_of_range_latitude_rejected(lat in 90.0001f64..1000.0, lon in -180.0f64..=180.0) {
        prop_assert!(index(lat, lon, 7).is_err());
        prop_assert!(index(-lat, lon, 7).is_err());
    }

    #[test]
    fn scores_are_complementary(
        moisture in 0.0f64..=100.0,
        soc in 0.0f64..=20.0,
        ph in 0.0f64..=14.0,
        temperature in -30.0f64..=60.0,
    ) {
        let inputs = SoilInputs { moisture_pct: moisture, soc_pct: soc, ph, temperature_celsius: temperature };
        let result = score_soil(&inputs, &ScoringConfig::default()).unwrap();

        prop_assert!((result.soil_quality_index + result.biochar_suitability_score - 100.0).abs() < 1e-9);
        prop_assert!((0.0..=100.0).contains(&result.soil_quality_index));
        prop_assert!((0.0..=100.0).contains(&result.biochar_suitability_score));
    }

    #[test]
    fn every_value_gets_a_rating(
        moisture in 0.0f64..=100.0,
        soc in 0.0f64..=50.0,
        ph in 0.0f64..=14.0,
        temperature in -50.0f64..=80.0,
    ) {
        for rating in [rate_moisture(moisture), rate_soc(soc), rate_ph(ph), rate_temperature(temperature)] {
            prop_assert!(LABELS.contains(&rating.label()));
            prop_assert!(rating.score() <= 3);
        }
    }

    #[test]
    fn higher_soc_never_rates_lower(a in 0.0f64..=20.0, b in 0.0f64..=20.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rate_soc(low) <= rate_soc(high));
    }
}

#[test]
fn rating_order_matches_scores() {
    assert!(Rating::VeryPoor < Rating::Poor);
    assert!(Rating::Moderate < Rating::Good);
}
