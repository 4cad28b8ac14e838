//! Windmill feasibility: wind class, slope suitability and open (barren) land.
//!
//! final = 0.5*wind + 0.3*slope_suitability + 0.2*land

use serde::{Deserialize, Serialize};

use super::{all_finite, round2, Assessment, Feasibility};
use crate::location::Location;
use crate::signals::{normalize::clamp01, SignalFetcher};

const W_WIND: f64 = 0.5;
const W_SLOPE: f64 = 0.3;
const W_LAND: f64 = 0.2;

/// Grade beyond which turbines are not sited at all.
pub const MAX_TURBINE_SLOPE_DEGREES: f64 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindmillReport {
    pub wind_score: f64,
    pub slope_score: f64,
    pub land_score: f64,
    pub windmill_feasibility_score: f64,
    pub verdict: Feasibility,
    pub feasibility: String,
}

pub fn feasibility_message(v: Feasibility) -> &'static str {
    match v {
        Feasibility::Feasible => "Windmill installation is feasible.",
        Feasibility::ModeratelyFeasible => "Windmill installation may be moderately feasible.",
        Feasibility::NotFeasible => "Windmill installation is not feasible.",
    }
}

/// Linear decay to zero at 15°, hard zero beyond it.
pub fn slope_suitability(slope_degrees: f64) -> f64 {
    if slope_degrees.is_nan() || slope_degrees > MAX_TURBINE_SLOPE_DEGREES {
        return 0.0;
    }
    clamp01(1.0 - slope_degrees / MAX_TURBINE_SLOPE_DEGREES)
}

/// Score from the wind step score, raw slope degrees and barren-cover fraction.
pub fn score(wind: f64, slope_degrees: f64, land: f64) -> Assessment<WindmillReport> {
    if !all_finite(&[wind, slope_degrees, land]) {
        return Assessment::unavailable("Could not compute the windmill feasibility score.");
    }
    let wind = clamp01(wind);
    let slope = slope_suitability(slope_degrees);
    let land = clamp01(land);

    let final_score = clamp01(W_WIND * wind + W_SLOPE * slope + W_LAND * land);
    let verdict = Feasibility::from_score(final_score);

    Assessment::Scored(WindmillReport {
        wind_score: round2(wind),
        slope_score: round2(slope),
        land_score: round2(land),
        windmill_feasibility_score: round2(final_score),
        verdict,
        feasibility: feasibility_message(verdict).to_string(),
    })
}

pub async fn assess(fetcher: &SignalFetcher, location: Location) -> Assessment<WindmillReport> {
    let (wind, slope, cover) = tokio::join!(
        fetcher.wind_score(location),
        fetcher.mean_slope_degrees(location),
        fetcher.land_cover(location),
    );
    let land = cover.value().map(|c| c.barren_cover).unwrap_or(0.0);
    score(wind.value_or(0.0), slope.value_or(0.0), land)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn slope_cutoff_is_hard() {
        assert_eq!(slope_suitability(0.0), 1.0);
        assert_eq!(slope_suitability(15.0), 0.0);
        assert_eq!(slope_suitability(16.0), 0.0);
        assert_abs_diff_eq!(slope_suitability(7.5), 0.5);
        assert_eq!(slope_suitability(-4.0), 1.0);
    }

    #[test]
    fn strong_wind_flat_barren_is_feasible() {
        let r = score(1.0, 0.0, 1.0).scored().cloned().unwrap();
        assert_abs_diff_eq!(r.windmill_feasibility_score, 1.0);
        assert_eq!(r.verdict, Feasibility::Feasible);
    }

    #[test]
    fn no_wind_is_at_most_moderate() {
        let r = score(0.0, 0.0, 1.0).scored().cloned().unwrap();
        assert_abs_diff_eq!(r.windmill_feasibility_score, 0.5);
        assert_eq!(r.verdict, Feasibility::ModeratelyFeasible);
    }
}
