// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod advisor;
pub mod api;
pub mod cache;
pub mod config;
pub mod forecast;
pub mod location;
pub mod metrics;
pub mod providers;
pub mod report;
pub mod scoring;
pub mod signals;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use crate::api::{create_router, AppState};
pub use crate::location::Location;
pub use crate::report::{ReportAssembler, ReportResponse, SustainabilityReport};

use crate::config::{AiConfig, Settings};
use crate::forecast::SolarForecaster;
use crate::providers::{geo_service::GeoServiceProvider, nasa_power::NasaPowerProvider};
use crate::signals::SignalFetcher;

/// Install the tracing subscriber: compact by default, JSON when
/// `LOG_FORMAT=json`. A subscriber that is already installed wins.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sustainability_analyzer=info,warn"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

/// Wire the HTTP providers, the fetcher with its caches, the forecaster and
/// the recommendation client.
pub fn build_assembler(settings: &Settings, ai: &AiConfig) -> Result<ReportAssembler> {
    let climate = Arc::new(NasaPowerProvider::new(&settings.climate)?);
    let terrain = Arc::new(GeoServiceProvider::new(&settings.terrain)?);
    let fetcher = Arc::new(SignalFetcher::new(climate, terrain, settings));
    let forecaster = Arc::new(SolarForecaster::new(&settings.forecast));
    let advisor = advisor::build_client_from_config(ai);
    info!(
        advisor = advisor.provider_name(),
        land_cover_radius_m = fetcher.land_cover_radius_m(),
        "report assembler ready"
    );
    Ok(ReportAssembler::new(fetcher, forecaster, advisor))
}
