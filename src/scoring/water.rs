//! Water harvesting: rainfall, soil and (inverted) slope.
//!
//! final = 0.5*rainfall + 0.2*soil + 0.3*(1 - slope)

use serde::{Deserialize, Serialize};

use super::{all_finite, round2, Assessment, Feasibility};
use crate::location::Location;
use crate::signals::{normalize::clamp01, SignalFetcher};

const W_RAINFALL: f64 = 0.5;
const W_SOIL: f64 = 0.2;
const W_FLATNESS: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterHarvestingReport {
    pub rainfall_score: f64,
    pub soil_score: f64,
    /// Inverted slope signal: 1.0 is flat ground.
    pub slope_score: f64,
    pub water_harvesting_score: f64,
    pub verdict: Feasibility,
    pub feasibility: String,
}

pub fn feasibility_message(v: Feasibility) -> &'static str {
    match v {
        Feasibility::Feasible => "Water harvesting is feasible in this area.",
        Feasibility::ModeratelyFeasible => "Water harvesting may be moderately feasible.",
        Feasibility::NotFeasible => "Water harvesting is not feasible in this area.",
    }
}

/// Score from normalized signals (`slope` is degrees/45, not yet inverted).
pub fn score(rainfall: f64, soil: f64, slope: f64) -> Assessment<WaterHarvestingReport> {
    if !all_finite(&[rainfall, soil, slope]) {
        return Assessment::unavailable("Could not compute the water harvesting score.");
    }
    let rainfall = clamp01(rainfall);
    let soil = clamp01(soil);
    let flatness = 1.0 - clamp01(slope);

    let final_score = clamp01(W_RAINFALL * rainfall + W_SOIL * soil + W_FLATNESS * flatness);
    let verdict = Feasibility::from_score(final_score);

    Assessment::Scored(WaterHarvestingReport {
        rainfall_score: round2(rainfall),
        soil_score: round2(soil),
        slope_score: round2(flatness),
        water_harvesting_score: round2(final_score),
        verdict,
        feasibility: feasibility_message(verdict).to_string(),
    })
}

pub async fn assess(fetcher: &SignalFetcher, location: Location) -> Assessment<WaterHarvestingReport> {
    let (rainfall, soil, slope) = tokio::join!(
        fetcher.rainfall_score(location),
        fetcher.soil_score(location),
        fetcher.slope_score(location),
    );
    score(rainfall.value_or(0.0), soil.value_or(0.0), slope.value_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scored(a: Assessment<WaterHarvestingReport>) -> WaterHarvestingReport {
        a.scored().cloned().expect("scored")
    }

    #[test]
    fn best_case_is_one_and_feasible() {
        let r = scored(score(1.0, 1.0, 0.0));
        assert_abs_diff_eq!(r.water_harvesting_score, 1.0);
        assert_eq!(r.verdict, Feasibility::Feasible);
        assert_eq!(r.slope_score, 1.0);
    }

    #[test]
    fn worst_case_is_zero_and_not_feasible() {
        let r = scored(score(0.0, 0.0, 1.0));
        assert_abs_diff_eq!(r.water_harvesting_score, 0.0);
        assert_eq!(r.verdict, Feasibility::NotFeasible);
    }

    #[test]
    fn middle_band_is_moderate() {
        // 0.5*0.4 + 0.2*0.5 + 0.3*(1-0.5) = 0.45
        let r = scored(score(0.4, 0.5, 0.5));
        assert_abs_diff_eq!(r.water_harvesting_score, 0.45);
        assert_eq!(r.verdict, Feasibility::ModeratelyFeasible);
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let r = scored(score(3.0, -1.0, -2.0));
        assert!((0.0..=1.0).contains(&r.water_harvesting_score));
        assert_eq!(r.rainfall_score, 1.0);
        assert_eq!(r.soil_score, 0.0);
    }

    #[test]
    fn non_finite_input_is_unavailable() {
        assert!(score(f64::NAN, 0.5, 0.5).message().is_some());
    }
}
