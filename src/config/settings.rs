// src/config/settings.rs
//! Runtime settings loaded from `config/sustainability.toml`.
//!
//! Lookup order:
//! 1) `$SUSTAINABILITY_CONFIG_PATH` (must exist if set)
//! 2) `config/sustainability.toml`
//! 3) built-in defaults
//!
//! Every section and field has a default, so a partial file is fine.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const ENV_CONFIG_PATH: &str = "SUSTAINABILITY_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/sustainability.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub climate: ClimateSettings,
    pub terrain: TerrainSettings,
    pub signals: SignalSettings,
    pub cache: CacheSettings,
    pub forecast: ForecastSettings,
    pub server: ServerSettings,
}

/// NASA POWER temporal API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateSettings {
    pub base_url: String,
    pub community: String,
    pub history_start: NaiveDate,
    pub history_end: NaiveDate,
    pub timeout_secs: u64,
}

impl Default for ClimateSettings {
    fn default() -> Self {
        Self {
            base_url: "https://power.larc.nasa.gov/api/temporal".to_string(),
            community: "RE".to_string(),
            history_start: NaiveDate::from_ymd_opt(1981, 1, 1).unwrap_or_default(),
            history_end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            timeout_secs: 60,
        }
    }
}

impl ClimateSettings {
    /// Whole years covered by the history window (inclusive of both ends).
    pub fn history_years(&self) -> f64 {
        use chrono::Datelike;
        let years = self.history_end.year() - self.history_start.year() + 1;
        f64::from(years.max(1))
    }
}

/// Geospatial reduce-region service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub base_url: String,
    /// "ENV" means: read from TERRAIN_API_KEY.
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8085".to_string(),
            api_key: String::new(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    /// Buffer radius for land-cover queries, shared by afforestation and windmill.
    pub land_cover_radius_m: f64,
    /// Upper bound on any single upstream call; expiry is cached as a failure.
    pub upstream_timeout_secs: u64,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            land_cover_radius_m: 3500.0,
            upstream_timeout_secs: 90,
        }
    }
}

impl SignalSettings {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_entries: u64,
    /// `None` keeps entries for the process lifetime (within `max_entries`).
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    pub max_bins: usize,
    pub early_stopping_rounds: usize,
    pub validation_fraction: f64,
    pub seed: u64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            n_estimators: 400,
            learning_rate: 0.05,
            max_depth: 6,
            min_samples_leaf: 20,
            max_bins: 64,
            early_stopping_rounds: 30,
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Settings {
    /// Load from an explicit TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing settings from {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(s)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Env var → default path → built-in defaults.
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load_from_file(&default_path);
        }
        Ok(Self::default())
    }

    /// Resolve "ENV" placeholders and repair out-of-range values.
    fn sanitize(&mut self) {
        if self.terrain.api_key.trim().eq_ignore_ascii_case("env") {
            self.terrain.api_key = std::env::var("TERRAIN_API_KEY").unwrap_or_default();
        }
        if self.climate.history_start > self.climate.history_end {
            std::mem::swap(
                &mut self.climate.history_start,
                &mut self.climate.history_end,
            );
        }
        if !(self.signals.land_cover_radius_m.is_finite() && self.signals.land_cover_radius_m > 0.0)
        {
            self.signals.land_cover_radius_m = SignalSettings::default().land_cover_radius_m;
        }
        let f = &mut self.forecast;
        if !(0.0..0.9).contains(&f.validation_fraction) {
            f.validation_fraction = ForecastSettings::default().validation_fraction;
        }
        if !(f.learning_rate > 0.0 && f.learning_rate <= 1.0) {
            f.learning_rate = ForecastSettings::default().learning_rate;
        }
        f.max_bins = f.max_bins.clamp(2, 256);
        f.max_depth = f.max_depth.max(1);
        f.min_samples_leaf = f.min_samples_leaf.max(1);
        self.cache.max_entries = self.cache.max_entries.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let s = Settings::from_toml_str(
            r#"
            [signals]
            land_cover_radius_m = 2000.0

            [forecast]
            n_estimators = 50
            "#,
        )
        .unwrap();
        assert_eq!(s.signals.land_cover_radius_m, 2000.0);
        assert_eq!(s.forecast.n_estimators, 50);
        assert_eq!(s.forecast.seed, 42);
        assert_eq!(s.climate.community, "RE");
        assert_eq!(s.climate.history_years(), 44.0);
        assert_eq!(s.cache.ttl_secs, None);
    }

    #[test]
    fn sanitize_repairs_bad_values() {
        let s = Settings::from_toml_str(
            r#"
            [climate]
            history_start = "2024-12-31"
            history_end = "1981-01-01"

            [signals]
            land_cover_radius_m = -5.0

            [forecast]
            validation_fraction = 1.5
            max_bins = 100000
            learning_rate = 0.0
            "#,
        )
        .unwrap();
        assert!(s.climate.history_start < s.climate.history_end);
        assert_eq!(s.signals.land_cover_radius_m, 3500.0);
        assert_eq!(s.forecast.validation_fraction, 0.2);
        assert_eq!(s.forecast.max_bins, 256);
        assert_eq!(s.forecast.learning_rate, 0.05);
    }
}
