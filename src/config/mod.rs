// src/config/mod.rs
pub mod ai;
pub mod settings;

pub use ai::AiConfig;
pub use settings::{
    CacheSettings, ClimateSettings, ForecastSettings, ServerSettings, Settings, SignalSettings,
    TerrainSettings,
};
