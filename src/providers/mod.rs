// src/providers/mod.rs
//! Upstream data providers: climate time series and geospatial reduce-region queries.
//!
//! The core only talks to the two traits below; `nasa_power` and `geo_service`
//! are the HTTP implementations used in production. Tests plug in fakes.

pub mod geo_service;
pub mod nasa_power;

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Climate parameters the analyzer consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClimateParameter {
    /// Bias-corrected total precipitation (mm/day).
    Precipitation,
    /// Wind speed at 50 m (m/s).
    WindSpeed50m,
    /// All-sky surface shortwave downward irradiance (kWh/m²/day).
    AllSkyRadiation,
    /// Clear-sky surface shortwave downward irradiance (kWh/m²/day).
    ClearSkyRadiation,
    /// Temperature at 2 m (°C).
    Temperature2m,
}

impl ClimateParameter {
    pub fn code(&self) -> &'static str {
        match self {
            ClimateParameter::Precipitation => "PRECTOTCORR",
            ClimateParameter::WindSpeed50m => "WS50M",
            ClimateParameter::AllSkyRadiation => "ALLSKY_SFC_SW_DWN",
            ClimateParameter::ClearSkyRadiation => "CLRSKY_SFC_SW_DWN",
            ClimateParameter::Temperature2m => "T2M",
        }
    }
}

/// Daily values per parameter; dates ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    columns: BTreeMap<ClimateParameter, BTreeMap<NaiveDate, f64>>,
}

impl DailySeries {
    pub fn insert(&mut self, param: ClimateParameter, date: NaiveDate, value: f64) {
        self.columns.entry(param).or_default().insert(date, value);
    }

    pub fn column(&self, param: ClimateParameter) -> Option<&BTreeMap<NaiveDate, f64>> {
        self.columns.get(&param)
    }

    /// All values of one parameter (empty if absent).
    pub fn values(&self, param: ClimateParameter) -> impl Iterator<Item = f64> + '_ {
        self.columns
            .get(&param)
            .into_iter()
            .flat_map(|c| c.values().copied())
    }

    pub fn get(&self, param: ClimateParameter, date: NaiveDate) -> Option<f64> {
        self.columns.get(&param).and_then(|c| c.get(&date)).copied()
    }
}

#[async_trait::async_trait]
pub trait ClimateProvider: Send + Sync {
    /// Daily values for `params` over `[start, end]`.
    async fn daily(
        &self,
        location: Location,
        params: &[ClimateParameter],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries>;

    /// Long-term climatology values (monthly + annual) of one parameter.
    async fn climatology(&self, location: Location, param: ClimateParameter) -> Result<Vec<f64>>;

    fn name(&self) -> &'static str;
}

// ------------------------------------------------------------
// Reduce-region queries
// ------------------------------------------------------------

/// Spatial reducer applied over the query geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Mean,
}

/// A point, optionally buffered into a disc of `buffer_m` metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub longitude: f64,
    pub latitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_m: Option<f64>,
}

impl Geometry {
    pub fn point(location: Location) -> Self {
        Self {
            longitude: location.longitude,
            latitude: location.latitude,
            buffer_m: None,
        }
    }

    pub fn buffered(location: Location, radius_m: f64) -> Self {
        Self {
            buffer_m: Some(radius_m),
            ..Self::point(location)
        }
    }
}

/// Cloud-filtered median composite the NDVI layers are computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageryFilter {
    pub collection: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Scenes with a cloudy-pixel percentage at or above this are dropped.
    pub max_cloud_pct: f64,
    pub nir_band: String,
    pub red_band: String,
}

impl Default for ImageryFilter {
    fn default() -> Self {
        Self {
            collection: "COPERNICUS/S2_SR_HARMONIZED".to_string(),
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
            max_cloud_pct: 5.0,
            nir_band: "B8".to_string(),
            red_band: "B4".to_string(),
        }
    }
}

/// NDVI-derived binary zones; the region mean of a zone is its cover fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "zone", rename_all = "snake_case")]
pub enum NdviZone {
    /// NDVI above `above`.
    Green { above: f64 },
    /// NDVI below `below`.
    Barren { below: f64 },
    /// Barren pixels within `proximity_m` of a green pixel.
    BarrenNearGreen {
        green_above: f64,
        barren_below: f64,
        proximity_m: f64,
    },
}

pub const GREEN_NDVI_MIN: f64 = 0.4;
pub const BARREN_NDVI_MAX: f64 = 0.2;
pub const GREEN_PROXIMITY_M: f64 = 500.0;

impl NdviZone {
    pub fn green() -> Self {
        NdviZone::Green {
            above: GREEN_NDVI_MIN,
        }
    }

    pub fn barren() -> Self {
        NdviZone::Barren {
            below: BARREN_NDVI_MAX,
        }
    }

    pub fn afforestation_candidates() -> Self {
        NdviZone::BarrenNearGreen {
            green_above: GREEN_NDVI_MIN,
            barren_below: BARREN_NDVI_MAX,
            proximity_m: GREEN_PROXIMITY_M,
        }
    }
}

/// Raster layer to reduce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    /// Single band of a static image (e.g. soil texture class).
    ImageBand { dataset: String, band: String },
    /// Terrain slope in degrees derived from a DEM.
    Slope { dem: String },
    /// NDVI zone fraction over a filtered composite.
    Ndvi {
        imagery: ImageryFilter,
        #[serde(flatten)]
        zone: NdviZone,
    },
}

impl Layer {
    pub fn soil_texture_class() -> Self {
        Layer::ImageBand {
            dataset: "OpenLandMap/SOL/SOL_TEXTURE-CLASS_USDA-TT_M/v02".to_string(),
            band: "b0".to_string(),
        }
    }

    pub fn srtm_slope() -> Self {
        Layer::Slope {
            dem: "USGS/SRTMGL1_003".to_string(),
        }
    }

    pub fn ndvi(zone: NdviZone) -> Self {
        Layer::Ndvi {
            imagery: ImageryFilter::default(),
            zone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionQuery {
    pub layer: Layer,
    pub geometry: Geometry,
    pub reducer: Reducer,
    pub scale_m: f64,
}

impl RegionQuery {
    /// Mean at 30 m scale, the resolution every analyzer query uses.
    pub fn mean(layer: Layer, geometry: Geometry) -> Self {
        Self {
            layer,
            geometry,
            reducer: Reducer::Mean,
            scale_m: 30.0,
        }
    }
}

#[async_trait::async_trait]
pub trait TerrainProvider: Send + Sync {
    /// Reduce `query.layer` over `query.geometry`. `Ok(None)` when the service
    /// has no value (e.g. no cloud-free imagery, outside dataset coverage).
    async fn reduce_region(&self, query: &RegionQuery) -> Result<Option<f64>>;

    fn name(&self) -> &'static str;
}
