// src/config/ai.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_daily_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "gemini" | "openai" (case-insensitive)
    pub provider: String,
    /// Model override; provider default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// Real (non-cached) calls allowed per UTC day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// "ENV" means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "gemini".to_string(),
            model: None,
            daily_limit: default_daily_limit(),
            api_key: String::new(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let cfg: AiConfig = serde_json::from_str(&data)?;
        cfg.resolved()
    }

    /// Missing or unreadable file means AI stays disabled.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "AI config unavailable; recommendations disabled");
                Self::default()
            }
        }
    }

    /// Normalize provider and resolve an "ENV" api key.
    pub fn resolved(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();

        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "gemini" => env::var("GEMINI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing GEMINI_API_KEY env var"))?,
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn env_key_is_resolved_per_provider() {
        env::set_var("GEMINI_API_KEY", "g-123");
        let cfg: AiConfig =
            serde_json::from_str(r#"{"enabled":true,"provider":"Gemini","api_key":"ENV"}"#)
                .unwrap();
        let cfg = cfg.resolved().unwrap();
        assert_eq!(cfg.provider, "gemini");
        assert_eq!(cfg.api_key, "g-123");
        assert_eq!(cfg.daily_limit, 20);
        env::remove_var("GEMINI_API_KEY");
    }

    #[test]
    fn unknown_provider_with_env_key_is_rejected() {
        let cfg: AiConfig =
            serde_json::from_str(r#"{"enabled":true,"provider":"claude","api_key":"env"}"#)
                .unwrap();
        assert!(cfg.resolved().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_disabled() {
        let cfg = AiConfig::load_or_default("definitely/not/here.json");
        assert!(!cfg.enabled);
    }
}
