//! HTTP client for the geospatial reduce-region service.
//!
//! Contract: `POST {base}/reduce-region` with a JSON [`RegionQuery`];
//! the service answers `{"value": <number|null>}`. A `null` value means the
//! layer had nothing to reduce (no cloud-free scenes, outside coverage).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{RegionQuery, TerrainProvider};
use crate::config::TerrainSettings;

#[derive(Debug, Deserialize)]
struct ReduceResponse {
    #[serde(default)]
    value: Option<f64>,
}

pub struct GeoServiceProvider {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeoServiceProvider {
    pub fn new(settings: &TerrainSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent("sustainability-analyzer/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .context("Failed to build geo service HTTP client")?;
        let api_key = Some(settings.api_key.trim().to_string()).filter(|k| !k.is_empty());
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn parse_value(body: &str) -> Result<Option<f64>> {
        let resp: ReduceResponse =
            serde_json::from_str(body).context("parsing reduce-region json")?;
        Ok(resp.value.filter(|v| v.is_finite()))
    }
}

#[async_trait]
impl TerrainProvider for GeoServiceProvider {
    async fn reduce_region(&self, query: &RegionQuery) -> Result<Option<f64>> {
        let url = format!("{}/reduce-region", self.base_url);
        let mut req = self.http.post(&url).json(query);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let body = req
            .send()
            .await
            .with_context(|| format!("POST {url}"))?
            .error_for_status()
            .with_context(|| format!("POST {url} status"))?
            .text()
            .await
            .context("reduce-region body")?;
        Self::parse_value(&body)
    }

    fn name(&self) -> &'static str {
        "geo_service"
    }
}
