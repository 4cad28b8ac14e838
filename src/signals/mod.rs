// src/signals/mod.rs
//! Signal fetchers: raw environmental signals for a coordinate.
//!
//! Every fetch goes through the provider cache and a timeout. Errors,
//! timeouts and empty answers become a cached [`SignalOutcome`], so an
//! identical later request returns the same outcome without retrying.

pub mod normalize;
pub mod outcome;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::ProviderCache;
use crate::config::{ClimateSettings, Settings, SignalSettings};
use crate::location::{Location, SignalKind};
use crate::providers::{
    ClimateParameter, ClimateProvider, DailySeries, Geometry, Layer, NdviZone, RegionQuery,
    TerrainProvider,
};

pub use outcome::SignalOutcome;

/// Region-mean cover fractions in [0,1] around a point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandCover {
    pub green_cover: f64,
    pub barren_cover: f64,
    pub afforestation_potential: f64,
}

/// One day of solar history with all three readings present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarDay {
    pub date: NaiveDate,
    /// Actual-sky irradiance (kWh/m²/day).
    pub all_sky: f64,
    /// Clear-sky irradiance (kWh/m²/day).
    pub clear_sky: f64,
    /// Temperature at 2 m (°C).
    pub temperature: f64,
}

pub type SolarHistory = Arc<Vec<SolarDay>>;

const SOLAR_PARAMS: [ClimateParameter; 3] = [
    ClimateParameter::AllSkyRadiation,
    ClimateParameter::ClearSkyRadiation,
    ClimateParameter::Temperature2m,
];

pub struct SignalFetcher {
    climate: Arc<dyn ClimateProvider>,
    terrain: Arc<dyn TerrainProvider>,
    window: ClimateSettings,
    settings: SignalSettings,
    scalars: ProviderCache<SignalOutcome<f64>>,
    covers: ProviderCache<SignalOutcome<LandCover>>,
    solar: ProviderCache<SignalOutcome<SolarHistory>>,
}

impl SignalFetcher {
    pub fn new(
        climate: Arc<dyn ClimateProvider>,
        terrain: Arc<dyn TerrainProvider>,
        settings: &Settings,
    ) -> Self {
        Self {
            climate,
            terrain,
            window: settings.climate.clone(),
            settings: settings.signals.clone(),
            scalars: ProviderCache::new(&settings.cache),
            covers: ProviderCache::new(&settings.cache),
            solar: ProviderCache::new(&settings.cache),
        }
    }

    /// Canonical buffer radius for land-cover lookups.
    pub fn land_cover_radius_m(&self) -> f64 {
        self.settings.land_cover_radius_m
    }

    /// Apply the upstream timeout and fold errors into an outcome.
    async fn guarded<T, F>(
        &self,
        kind: SignalKind,
        provider: &'static str,
        location: Location,
        fut: F,
    ) -> SignalOutcome<T>
    where
        F: Future<Output = Result<Option<T>>>,
    {
        let timeout = self.settings.upstream_timeout();
        let outcome = match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(v)) => SignalOutcome::from(v),
            Ok(Err(e)) => {
                warn!(
                    error = %format!("{e:#}"),
                    kind = kind.as_str(),
                    provider,
                    %location,
                    "signal fetch failed"
                );
                SignalOutcome::Failed(format!("{e:#}"))
            }
            Err(_) => {
                warn!(
                    kind = kind.as_str(),
                    provider,
                    %location,
                    timeout_secs = timeout.as_secs(),
                    "signal fetch timed out"
                );
                SignalOutcome::Failed(format!("timed out after {}s", timeout.as_secs()))
            }
        };
        counter!(
            "signal_fetch_total",
            "kind" => kind.as_str(),
            "provider" => provider,
            "outcome" => outcome.label()
        )
        .increment(1);
        outcome
    }

    // ---------------- raw measurements ----------------

    /// Average annual rainfall (mm) over the history window.
    pub async fn annual_rainfall_mm(&self, location: Location) -> SignalOutcome<f64> {
        let kind = SignalKind::Rainfall;
        let years = self.window.history_years();
        let fut = async {
            let series = self
                .climate
                .daily(
                    location,
                    &[ClimateParameter::Precipitation],
                    self.window.history_start,
                    self.window.history_end,
                )
                .await?;
            Ok(normalize::annual_total(
                series.values(ClimateParameter::Precipitation),
                years,
            ))
        };
        self.scalars
            .get_or_compute(
                location.key(kind),
                self.guarded(kind, self.climate.name(), location, fut),
            )
            .await
    }

    /// Long-term mean wind speed at 50 m (m/s).
    pub async fn mean_wind_speed(&self, location: Location) -> SignalOutcome<f64> {
        let kind = SignalKind::WindSpeed;
        let fut = async {
            let values = self
                .climate
                .climatology(location, ClimateParameter::WindSpeed50m)
                .await?;
            Ok(normalize::mean_non_negative(values))
        };
        self.scalars
            .get_or_compute(
                location.key(kind),
                self.guarded(kind, self.climate.name(), location, fut),
            )
            .await
    }

    /// USDA soil texture class index at the point.
    pub async fn soil_texture_class(&self, location: Location) -> SignalOutcome<f64> {
        let kind = SignalKind::SoilTexture;
        let query = RegionQuery::mean(Layer::soil_texture_class(), Geometry::point(location));
        let fut = async { self.terrain.reduce_region(&query).await };
        self.scalars
            .get_or_compute(
                location.key(kind),
                self.guarded(kind, self.terrain.name(), location, fut),
            )
            .await
    }

    /// Mean terrain slope at the point (degrees).
    pub async fn mean_slope_degrees(&self, location: Location) -> SignalOutcome<f64> {
        let kind = SignalKind::Slope;
        let query = RegionQuery::mean(Layer::srtm_slope(), Geometry::point(location));
        let fut = async { self.terrain.reduce_region(&query).await };
        self.scalars
            .get_or_compute(
                location.key(kind),
                self.guarded(kind, self.terrain.name(), location, fut),
            )
            .await
    }

    /// Land cover at the canonical radius.
    pub async fn land_cover(&self, location: Location) -> SignalOutcome<LandCover> {
        self.land_cover_at(location, self.settings.land_cover_radius_m)
            .await
    }

    /// Green / barren / afforestation-potential fractions within `radius_m`.
    /// Any of the three missing means no data for the whole bundle.
    pub async fn land_cover_at(&self, location: Location, radius_m: f64) -> SignalOutcome<LandCover> {
        let kind = SignalKind::LandCover;
        let region = Geometry::buffered(location, radius_m);
        let green_q = RegionQuery::mean(Layer::ndvi(NdviZone::green()), region);
        let barren_q = RegionQuery::mean(Layer::ndvi(NdviZone::barren()), region);
        let potential_q =
            RegionQuery::mean(Layer::ndvi(NdviZone::afforestation_candidates()), region);
        let fut = async {
            let (green, barren, potential) = tokio::try_join!(
                self.terrain.reduce_region(&green_q),
                self.terrain.reduce_region(&barren_q),
                self.terrain.reduce_region(&potential_q),
            )?;
            Ok(match (green, barren, potential) {
                (Some(g), Some(b), Some(p)) => Some(LandCover {
                    green_cover: normalize::clamp01(g),
                    barren_cover: normalize::clamp01(b),
                    afforestation_potential: normalize::clamp01(p),
                }),
                _ => None,
            })
        };
        self.covers
            .get_or_compute(
                location.key_with_radius(kind, radius_m),
                self.guarded(kind, self.terrain.name(), location, fut),
            )
            .await
    }

    /// Daily all-sky/clear-sky/temperature history over the window.
    pub async fn solar_history(&self, location: Location) -> SignalOutcome<SolarHistory> {
        let kind = SignalKind::SolarHistory;
        let fut = async {
            let series = self
                .climate
                .daily(
                    location,
                    &SOLAR_PARAMS,
                    self.window.history_start,
                    self.window.history_end,
                )
                .await?;
            let days = solar_days(&series);
            Ok((!days.is_empty()).then(|| Arc::new(days)))
        };
        self.solar
            .get_or_compute(
                location.key(kind),
                self.guarded(kind, self.climate.name(), location, fut),
            )
            .await
    }

    // ---------------- normalized signals ----------------

    pub async fn rainfall_score(&self, location: Location) -> SignalOutcome<f64> {
        self.annual_rainfall_mm(location)
            .await
            .map(normalize::rainfall_score)
    }

    pub async fn wind_score(&self, location: Location) -> SignalOutcome<f64> {
        self.mean_wind_speed(location)
            .await
            .map(normalize::wind_score)
    }

    pub async fn soil_score(&self, location: Location) -> SignalOutcome<f64> {
        self.soil_texture_class(location)
            .await
            .map(normalize::soil_score)
    }

    pub async fn slope_score(&self, location: Location) -> SignalOutcome<f64> {
        self.mean_slope_degrees(location)
            .await
            .map(normalize::slope_score)
    }
}

/// Join the three solar columns on date, keeping only complete days.
pub fn solar_days(series: &DailySeries) -> Vec<SolarDay> {
    let Some(all_sky) = series.column(ClimateParameter::AllSkyRadiation) else {
        return Vec::new();
    };
    all_sky
        .iter()
        .filter_map(|(&date, &all)| {
            let clear = series.get(ClimateParameter::ClearSkyRadiation, date)?;
            let temperature = series.get(ClimateParameter::Temperature2m, date)?;
            Some(SolarDay {
                date,
                all_sky: all,
                clear_sky: clear,
                temperature,
            })
        })
        .collect()
}
