//! # Location & cache identity
//! A request coordinate and the composite key used by the provider cache.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A WGS84 coordinate. Created per request, never persisted.
///
/// Deserialization goes through [`Location::new`], so an out-of-range
/// coordinate never becomes a `Location`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
struct RawLocation {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawLocation> for Location {
    type Error = anyhow::Error;

    fn try_from(raw: RawLocation) -> anyhow::Result<Self> {
        Location::new(raw.latitude, raw.longitude)
    }
}

impl Location {
    /// Validating constructor used at the API boundary.
    pub fn new(latitude: f64, longitude: f64) -> anyhow::Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            anyhow::bail!("coordinates must be finite numbers");
        }
        if !(-90.0..=90.0).contains(&latitude) {
            anyhow::bail!("latitude {latitude} is outside [-90, 90]");
        }
        if !(-180.0..=180.0).contains(&longitude) {
            anyhow::bail!("longitude {longitude} is outside [-180, 180]");
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Cache key for a signal at this location (no radius).
    pub fn key(&self, kind: SignalKind) -> CacheKey {
        CacheKey::new(*self, kind, None)
    }

    /// Cache key for a buffered-region signal.
    pub fn key_with_radius(&self, kind: SignalKind, radius_m: f64) -> CacheKey {
        CacheKey::new(*self, kind, Some(radius_m))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// What a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Rainfall,
    WindSpeed,
    SoilTexture,
    Slope,
    LandCover,
    SolarHistory,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Rainfall => "rainfall",
            SignalKind::WindSpeed => "wind_speed",
            SignalKind::SoilTexture => "soil_texture",
            SignalKind::Slope => "slope",
            SignalKind::LandCover => "land_cover",
            SignalKind::SolarHistory => "solar_history",
        }
    }
}

/// Identity of a provider cache entry.
///
/// Floats are compared by bit pattern, so two coordinates share an entry only
/// when they are exactly equal. `-0.0` is folded into `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lat_bits: u64,
    lon_bits: u64,
    kind: SignalKind,
    radius_bits: Option<u64>,
}

impl CacheKey {
    pub fn new(location: Location, kind: SignalKind, radius_m: Option<f64>) -> Self {
        Self {
            lat_bits: canonical_bits(location.latitude),
            lon_bits: canonical_bits(location.longitude),
            kind,
            radius_bits: radius_m.map(canonical_bits),
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = f64::from_bits(self.lat_bits);
        let lon = f64::from_bits(self.lon_bits);
        match self.radius_bits {
            Some(r) => write!(f, "{lat}_{lon}_{}_{}", self.kind.as_str(), f64::from_bits(r)),
            None => write!(f, "{lat}_{lon}_{}", self.kind.as_str()),
        }
    }
}

fn canonical_bits(x: f64) -> u64 {
    if x == 0.0 {
        0.0f64.to_bits()
    } else {
        x.to_bits()
    }
}
