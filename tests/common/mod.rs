// tests/common/mod.rs
//
// In-memory providers and wiring shared by the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use sustainability_analyzer::advisor::{CachingClient, DynRecommender, MockProvider};
use sustainability_analyzer::config::Settings;
use sustainability_analyzer::forecast::SolarForecaster;
use sustainability_analyzer::location::Location;
use sustainability_analyzer::providers::{
    ClimateParameter, ClimateProvider, DailySeries, Layer, NdviZone, RegionQuery,
    TerrainProvider,
};
use sustainability_analyzer::report::ReportAssembler;
use sustainability_analyzer::signals::SignalFetcher;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn loc(lat: f64, lon: f64) -> Location {
    Location::new(lat, lon).expect("valid location")
}

/// Three-year window and a small model so tests stay fast.
pub fn test_settings() -> Settings {
    let mut s = Settings::default();
    s.climate.history_start = date(2021, 1, 1);
    s.climate.history_end = date(2023, 12, 31);
    s.signals.upstream_timeout_secs = 1;
    s.forecast.n_estimators = 60;
    s.forecast.learning_rate = 0.1;
    s.forecast.max_depth = 4;
    s
}

// ------------------------------------------------------------
// Climate
// ------------------------------------------------------------

pub struct FakeClimate {
    /// Daily precipitation (mm); `None` returns an empty column.
    pub rain_mm_per_day: Mutex<Option<f64>>,
    pub wind: Mutex<Vec<f64>>,
    /// Mean of the synthetic seasonal all-sky series; `None` means no solar data.
    pub solar_mean: Mutex<Option<f64>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl Default for FakeClimate {
    fn default() -> Self {
        Self {
            rain_mm_per_day: Mutex::new(Some(2.0)),
            wind: Mutex::new(vec![6.0; 13]),
            solar_mean: Mutex::new(Some(5.5)),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeClimate {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClimateProvider for FakeClimate {
    async fn daily(
        &self,
        _location: Location,
        params: &[ClimateParameter],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("climate upstream unavailable");
        }
        let rain = *self.rain_mm_per_day.lock().unwrap();
        let solar = *self.solar_mean.lock().unwrap();
        let mut series = DailySeries::default();
        for day in start.iter_days().take_while(|d| *d <= end) {
            let phase = 2.0 * std::f64::consts::PI * day.ordinal() as f64 / 365.0;
            for &p in params {
                let value = match p {
                    ClimateParameter::Precipitation => rain,
                    ClimateParameter::AllSkyRadiation => solar.map(|m| m + phase.sin()),
                    ClimateParameter::ClearSkyRadiation => solar.map(|m| m + 1.5 + phase.sin()),
                    ClimateParameter::Temperature2m => solar.map(|_| 22.0 + 6.0 * phase.sin()),
                    ClimateParameter::WindSpeed50m => None,
                };
                if let Some(v) = value {
                    series.insert(p, day, v);
                }
            }
        }
        Ok(series)
    }

    async fn climatology(&self, _location: Location, _param: ClimateParameter) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("climate upstream unavailable");
        }
        Ok(self.wind.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "fake-climate"
    }
}

// ------------------------------------------------------------
// Terrain
// ------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct TerrainValues {
    pub soil_class: Option<f64>,
    pub slope_degrees: Option<f64>,
    pub green: Option<f64>,
    pub barren: Option<f64>,
    pub potential: Option<f64>,
}

impl Default for TerrainValues {
    fn default() -> Self {
        Self {
            soil_class: Some(7.0),
            slope_degrees: Some(3.0),
            green: Some(0.35),
            barren: Some(0.4),
            potential: Some(0.15),
        }
    }
}

#[derive(Default)]
pub struct FakeTerrain {
    pub values: Mutex<TerrainValues>,
    pub fail: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
    pub radii: Mutex<Vec<Option<f64>>>,
}

impl FakeTerrain {
    pub fn with(values: TerrainValues) -> Self {
        Self {
            values: Mutex::new(values),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TerrainProvider for FakeTerrain {
    async fn reduce_region(&self, query: &RegionQuery) -> Result<Option<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.radii.lock().unwrap().push(query.geometry.buffer_m);
        let delay = *self.delay.lock().unwrap();
        if let Some(d) = delay {
            tokio::time::sleep(d).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("terrain upstream unavailable");
        }
        let v = *self.values.lock().unwrap();
        Ok(match &query.layer {
            Layer::ImageBand { .. } => v.soil_class,
            Layer::Slope { .. } => v.slope_degrees,
            Layer::Ndvi { zone, .. } => match zone {
                NdviZone::Green { .. } => v.green,
                NdviZone::Barren { .. } => v.barren,
                NdviZone::BarrenNearGreen { .. } => v.potential,
            },
        })
    }

    fn name(&self) -> &'static str {
        "fake-terrain"
    }
}

// ------------------------------------------------------------
// Wiring
// ------------------------------------------------------------

pub struct Harness {
    pub climate: Arc<FakeClimate>,
    pub terrain: Arc<FakeTerrain>,
    pub fetcher: Arc<SignalFetcher>,
    pub settings: Settings,
}

impl Harness {
    pub fn new(climate: FakeClimate, terrain: FakeTerrain) -> Self {
        Self::with_settings(climate, terrain, test_settings())
    }

    pub fn with_settings(climate: FakeClimate, terrain: FakeTerrain, settings: Settings) -> Self {
        let climate = Arc::new(climate);
        let terrain = Arc::new(terrain);
        let fetcher = Arc::new(SignalFetcher::new(
            climate.clone(),
            terrain.clone(),
            &settings,
        ));
        Self {
            climate,
            terrain,
            fetcher,
            settings,
        }
    }

    pub fn forecaster(&self) -> SolarForecaster {
        SolarForecaster::new(&self.settings.forecast)
    }

    pub fn assembler(&self, advisor: DynRecommender) -> ReportAssembler {
        ReportAssembler::new(
            self.fetcher.clone(),
            Arc::new(self.forecaster()),
            advisor,
        )
    }
}

pub fn mock_advisor(dir: &std::path::Path) -> DynRecommender {
    Arc::new(CachingClient::new(
        MockProvider::default(),
        dir.to_path_buf(),
        20,
    ))
}
