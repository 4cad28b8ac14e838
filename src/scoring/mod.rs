// src/scoring/mod.rs
//! Scorers: combine normalized signals into a final score and a verdict.
//!
//! Each scorer has a pure `score*` function and an async `assess` entry that
//! only adds the fetcher calls. Entries never fail: every failure mode ends
//! up as [`Assessment::Unavailable`] or as a default signal value.

pub mod afforestation;
pub mod solar;
pub mod water;
pub mod windmill;

use serde::{Deserialize, Serialize};

pub use afforestation::AfforestationReport;
pub use solar::{SolarPotential, SolarReport};
pub use water::WaterHarvestingReport;
pub use windmill::WindmillReport;

/// Feasible at or above this final score.
pub const FEASIBLE_MIN: f64 = 0.6;
/// Moderately feasible at or above this final score.
pub const MODERATE_MIN: f64 = 0.4;

/// A scored section, or the reason it could not be scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Assessment<T> {
    Scored(T),
    Unavailable { message: String },
}

impl<T> Assessment<T> {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Assessment::Unavailable {
            message: message.into(),
        }
    }

    pub fn scored(&self) -> Option<&T> {
        match self {
            Assessment::Scored(t) => Some(t),
            Assessment::Unavailable { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Assessment::Scored(_) => None,
            Assessment::Unavailable { message } => Some(message),
        }
    }
}

/// Tiered verdict for weighted scores. Lower bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feasibility {
    NotFeasible,
    ModeratelyFeasible,
    Feasible,
}

impl Feasibility {
    pub fn from_score(score: f64) -> Self {
        if score >= FEASIBLE_MIN {
            Feasibility::Feasible
        } else if score >= MODERATE_MIN {
            Feasibility::ModeratelyFeasible
        } else {
            Feasibility::NotFeasible
        }
    }
}

/// Presentation rounding (2 decimals).
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Guard against NaN/inf leaking from a provider into a formula.
pub(crate) fn all_finite(xs: &[f64]) -> bool {
    xs.iter().all(|x| x.is_finite())
}
