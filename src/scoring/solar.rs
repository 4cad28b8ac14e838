//! Solar potential from the forecast yearly average irradiance.

use serde::{Deserialize, Serialize};

use super::{round2, Assessment};
use crate::forecast::{SolarForecast, SolarForecaster};
use crate::location::Location;
use crate::signals::SignalFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolarPotential {
    Low,
    Moderate,
    Good,
    Excellent,
}

impl SolarPotential {
    /// Bands in kWh/m²/day: (5, ∞) excellent, [3.5, 5] good, [2, 3.5) moderate.
    pub fn from_average(kwh_per_m2_day: f64) -> Self {
        if kwh_per_m2_day > 5.0 {
            SolarPotential::Excellent
        } else if kwh_per_m2_day >= 3.5 {
            SolarPotential::Good
        } else if kwh_per_m2_day >= 2.0 {
            SolarPotential::Moderate
        } else {
            SolarPotential::Low
        }
    }

    pub fn recommendation(self) -> &'static str {
        match self {
            SolarPotential::Excellent => {
                "Excellent potential! Installing solar is a great investment."
            }
            SolarPotential::Good => "Good potential. Solar installation is beneficial.",
            SolarPotential::Moderate => {
                "Moderate potential. Consider additional analysis before installation."
            }
            SolarPotential::Low => "Low potential. Solar may not be a cost-effective option.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarReport {
    pub average_radiation: f64,
    pub forecast_year: i32,
    pub potential: SolarPotential,
    pub result: String,
}

pub fn score(forecast: &SolarForecast) -> Assessment<SolarReport> {
    match forecast {
        SolarForecast::Forecast(f) if f.yearly_average.is_finite() => {
            let potential = SolarPotential::from_average(f.yearly_average);
            Assessment::Scored(SolarReport {
                average_radiation: round2(f.yearly_average),
                forecast_year: f.year,
                potential,
                result: potential.recommendation().to_string(),
            })
        }
        SolarForecast::Forecast(_) => {
            Assessment::unavailable("Could not compute the solar forecast.")
        }
        SolarForecast::NoData { .. } => {
            Assessment::unavailable("No solar radiation history available for this location.")
        }
        SolarForecast::Failed { .. } => Assessment::unavailable("Failed to fetch NASA data."),
    }
}

pub async fn assess(
    fetcher: &SignalFetcher,
    forecaster: &SolarForecaster,
    location: Location,
) -> Assessment<SolarReport> {
    score(&forecaster.forecast(fetcher, location).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::YearlyForecast;

    #[test]
    fn potential_bands() {
        assert_eq!(SolarPotential::from_average(5.01), SolarPotential::Excellent);
        assert_eq!(SolarPotential::from_average(5.0), SolarPotential::Good);
        assert_eq!(SolarPotential::from_average(3.5), SolarPotential::Good);
        assert_eq!(SolarPotential::from_average(3.49), SolarPotential::Moderate);
        assert_eq!(SolarPotential::from_average(2.0), SolarPotential::Moderate);
        assert_eq!(SolarPotential::from_average(1.99), SolarPotential::Low);
        assert_eq!(SolarPotential::from_average(0.0), SolarPotential::Low);
    }

    #[test]
    fn forecast_is_rounded_and_labelled() {
        let f = SolarForecast::Forecast(YearlyForecast {
            year: 2025,
            yearly_average: 5.4567,
            days: 365,
            training_rows: 1000,
            trees: 120,
        });
        let r = score(&f).scored().cloned().unwrap();
        assert_eq!(r.average_radiation, 5.46);
        assert_eq!(r.forecast_year, 2025);
        assert_eq!(r.potential, SolarPotential::Excellent);
    }

    #[test]
    fn no_data_is_a_message_not_zero() {
        let f = SolarForecast::NoData {
            reason: "empty".into(),
        };
        assert!(score(&f).scored().is_none());
    }
}
