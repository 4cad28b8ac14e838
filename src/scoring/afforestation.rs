//! Afforestation: a conjunction over land-cover fractions, not a weighted score.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{all_finite, round2, Assessment};
use crate::location::Location;
use crate::signals::{LandCover, SignalFetcher, SignalOutcome};

pub const MIN_GREEN_FRACTION: f64 = 0.2;
pub const MIN_POTENTIAL_FRACTION: f64 = 0.1;

pub const NO_IMAGERY_MESSAGE: &str =
    "No cloud-free Sentinel-2 imagery available or error occurred.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AfforestationReport {
    pub green_cover_percent: f64,
    pub barren_land_percent: f64,
    pub afforestation_potential_percent: f64,
    pub feasible: bool,
    pub feasibility: String,
}

pub fn is_feasible(cover: &LandCover) -> bool {
    cover.green_cover > MIN_GREEN_FRACTION && cover.afforestation_potential > MIN_POTENTIAL_FRACTION
}

pub fn score(cover: &LandCover) -> Assessment<AfforestationReport> {
    if !all_finite(&[
        cover.green_cover,
        cover.barren_cover,
        cover.afforestation_potential,
    ]) {
        return Assessment::unavailable("Could not compute NDVI values accurately.");
    }
    let feasible = is_feasible(cover);
    let feasibility = if feasible {
        "Afforestation is feasible in this area."
    } else {
        "Afforestation is NOT feasible in this area."
    };
    Assessment::Scored(AfforestationReport {
        green_cover_percent: round2(cover.green_cover * 100.0),
        barren_land_percent: round2(cover.barren_cover * 100.0),
        afforestation_potential_percent: round2(cover.afforestation_potential * 100.0),
        feasible,
        feasibility: feasibility.to_string(),
    })
}

pub async fn assess(fetcher: &SignalFetcher, location: Location) -> Assessment<AfforestationReport> {
    match fetcher.land_cover(location).await {
        SignalOutcome::Value(cover) => score(&cover),
        other => {
            info!(%location, outcome = other.label(), "afforestation: no land cover");
            Assessment::unavailable(NO_IMAGERY_MESSAGE)
        }
    }
}
