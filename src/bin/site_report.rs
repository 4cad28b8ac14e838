//! Compute one sustainability report for a coordinate and print it as JSON.
//!
//! Usage: `site_report <latitude> <longitude> [--no-recommendations]`

use anyhow::Result;
use clap::Parser;

use sustainability_analyzer::config::{ai::DEFAULT_AI_CONFIG_PATH, AiConfig, Settings};
use sustainability_analyzer::{build_assembler, init_tracing, Location};

#[derive(Parser, Debug)]
#[command(
    name = "site_report",
    about = "Print the sustainability report for one coordinate"
)]
struct Args {
    /// Latitude in degrees, [-90, 90]
    #[arg(allow_negative_numbers = true)]
    latitude: f64,

    /// Longitude in degrees, [-180, 180]
    #[arg(allow_negative_numbers = true)]
    longitude: f64,

    /// Skip the recommendation provider and print the report only
    #[arg(long)]
    no_recommendations: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _ = dotenvy::dotenv();
    init_tracing();

    let location = Location::new(args.latitude, args.longitude)?;
    let settings = Settings::load()?;
    let ai = AiConfig::load_or_default(DEFAULT_AI_CONFIG_PATH);
    let assembler = build_assembler(&settings, &ai)?;

    let json = if args.no_recommendations {
        serde_json::to_string_pretty(&assembler.report(location).await?)?
    } else {
        serde_json::to_string_pretty(&assembler.respond(location).await?)?
    };
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_negative_coordinates_and_flag() {
        let args = Args::try_parse_from(["site_report", "-33.87", "151.21", "--no-recommendations"])
            .unwrap();
        assert_eq!(args.latitude, -33.87);
        assert_eq!(args.longitude, 151.21);
        assert!(args.no_recommendations);
    }

    #[test]
    fn rejects_non_numeric_latitude() {
        assert!(Args::try_parse_from(["site_report", "north", "10"]).is_err());
    }
}
