//! Prompt text for the recommendation model.

use std::fmt::Write;

use crate::report::SustainabilityReport;
use crate::scoring::Assessment;

const PREAMBLE: &str = "You are an assistant for a sustainability analysis platform. \
Below is a sustainability report for a specific location. Analyze the data and provide \
actionable recommendations to improve sustainability in the areas of solar potential, \
afforestation, water harvesting and windmill feasibility. Be concise, professional and \
focus on practical steps. Format the response exactly as follows, with one recommendation \
per bullet point:

**Solar Energy:**
* Recommendation for solar energy
**Afforestation:**
* Recommendation for afforestation
**Water Harvesting:**
* Recommendation for water harvesting
**Wind Energy:**
* Recommendation for wind energy
";

/// Section labels the model is asked to produce, in order.
pub const SECTION_LABELS: [&str; 4] = [
    "Solar Energy",
    "Afforestation",
    "Water Harvesting",
    "Wind Energy",
];

fn section<T>(
    out: &mut String,
    title: &str,
    assessment: &Assessment<T>,
    lines: impl FnOnce(&T) -> Vec<(&'static str, String)>,
) {
    let _ = writeln!(out, "- {title}:");
    match assessment {
        Assessment::Scored(t) => {
            for (label, value) in lines(t) {
                let _ = writeln!(out, "  - {label}: {value}");
            }
        }
        Assessment::Unavailable { message } => {
            let _ = writeln!(out, "  - Unavailable: {message}");
        }
    }
}

pub fn build_prompt(report: &SustainabilityReport) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(PREAMBLE);
    out.push_str("\nData:\n");

    section(&mut out, "Solar Potential", &report.solar_potential, |s| {
        vec![
            ("Average Radiation", format!("{} kWh/m²/day", s.average_radiation)),
            ("Forecast Year", s.forecast_year.to_string()),
            ("Result", s.result.clone()),
        ]
    });
    section(
        &mut out,
        "Afforestation Feasibility",
        &report.afforestation_feasibility,
        |a| {
            vec![
                ("Green Cover", format!("{}%", a.green_cover_percent)),
                ("Barren Land", format!("{}%", a.barren_land_percent)),
                (
                    "Afforestation Potential",
                    format!("{}%", a.afforestation_potential_percent),
                ),
                ("Feasibility", a.feasibility.clone()),
            ]
        },
    );
    section(&mut out, "Water Harvesting", &report.water_harvesting, |w| {
        vec![
            ("Rainfall Score", w.rainfall_score.to_string()),
            ("Soil Score", w.soil_score.to_string()),
            ("Slope Score", w.slope_score.to_string()),
            ("Water Harvesting Score", w.water_harvesting_score.to_string()),
            ("Feasibility", w.feasibility.clone()),
        ]
    });
    section(
        &mut out,
        "Windmill Feasibility",
        &report.windmill_feasibility,
        |w| {
            vec![
                ("Wind Score", w.wind_score.to_string()),
                ("Slope Score", w.slope_score.to_string()),
                ("Land Score", w.land_score.to_string()),
                (
                    "Windmill Feasibility Score",
                    w.windmill_feasibility_score.to_string(),
                ),
                ("Feasibility", w.feasibility.clone()),
            ]
        },
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{water, Feasibility, WaterHarvestingReport};

    fn report() -> SustainabilityReport {
        SustainabilityReport {
            solar_potential: Assessment::unavailable("Failed to fetch NASA data."),
            afforestation_feasibility: Assessment::unavailable("no imagery"),
            water_harvesting: Assessment::Scored(WaterHarvestingReport {
                rainfall_score: 0.8,
                soil_score: 0.3,
                slope_score: 0.9,
                water_harvesting_score: 0.73,
                verdict: Feasibility::Feasible,
                feasibility: water::feasibility_message(Feasibility::Feasible).to_string(),
            }),
            windmill_feasibility: Assessment::unavailable("no wind"),
        }
    }

    #[test]
    fn asks_for_all_four_sections() {
        let p = build_prompt(&report());
        for label in SECTION_LABELS {
            assert!(p.contains(&format!("**{label}:**")), "missing {label}");
        }
    }

    #[test]
    fn renders_figures_and_unavailable_messages() {
        let p = build_prompt(&report());
        assert!(p.contains("  - Water Harvesting Score: 0.73"));
        assert!(p.contains("  - Unavailable: Failed to fetch NASA data."));
        assert!(p.contains("  - Unavailable: no wind"));
    }
}
