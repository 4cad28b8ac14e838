//! NASA POWER temporal API client.
//!
//! API: `{base}/daily/point` and `{base}/climatology/point`
//! Auth: none. Values live under `properties.parameter.<CODE>`, keyed by
//! `YYYYMMDD` (daily) or month abbreviation / `ANN` (climatology).
//! Missing observations carry the fill value (-999).

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{ClimateParameter, ClimateProvider, DailySeries};
use crate::config::ClimateSettings;
use crate::location::Location;

pub const FILL_VALUE: f64 = -999.0;

#[derive(Debug, Deserialize)]
struct PowerResponse {
    #[serde(default)]
    header: Option<PowerHeader>,
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerHeader {
    #[serde(default)]
    fill_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, BTreeMap<String, Option<f64>>>,
}

impl PowerResponse {
    fn fill_value(&self) -> f64 {
        self.header
            .as_ref()
            .and_then(|h| h.fill_value)
            .unwrap_or(FILL_VALUE)
    }

    fn column(&self, param: ClimateParameter) -> Result<&BTreeMap<String, Option<f64>>> {
        self.properties
            .parameter
            .get(param.code())
            .ok_or_else(|| anyhow!("parameter {} missing from response", param.code()))
    }
}

pub struct NasaPowerProvider {
    http: Client,
    base_url: String,
    community: String,
}

impl NasaPowerProvider {
    pub fn new(settings: &ClimateSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent("sustainability-analyzer/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(settings.timeout_secs.max(1)))
            .build()
            .context("Failed to build NASA POWER HTTP client")?;
        Ok(Self {
            http,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            community: settings.community.clone(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} status"))?;
        resp.text().await.context("NASA POWER body")
    }

    /// Parse a daily response into a series, dropping fill values.
    pub fn parse_daily(body: &str, params: &[ClimateParameter]) -> Result<DailySeries> {
        let resp: PowerResponse =
            serde_json::from_str(body).context("parsing NASA POWER daily json")?;
        let fill = resp.fill_value();
        let mut series = DailySeries::default();
        for &param in params {
            for (raw_date, value) in resp.column(param)? {
                let Some(v) = value.filter(|v| !is_fill(*v, fill)) else {
                    continue;
                };
                let date = NaiveDate::parse_from_str(raw_date, "%Y%m%d")
                    .with_context(|| format!("bad date key {raw_date}"))?;
                series.insert(param, date, v);
            }
        }
        Ok(series)
    }

    /// Parse a climatology response into its values (months + annual).
    pub fn parse_climatology(body: &str, param: ClimateParameter) -> Result<Vec<f64>> {
        let resp: PowerResponse =
            serde_json::from_str(body).context("parsing NASA POWER climatology json")?;
        let fill = resp.fill_value();
        Ok(resp
            .column(param)?
            .values()
            .filter_map(|v| *v)
            .filter(|v| !is_fill(*v, fill))
            .collect())
    }
}

fn is_fill(v: f64, fill: f64) -> bool {
    !v.is_finite() || (v - fill).abs() < f64::EPSILON
}

fn codes(params: &[ClimateParameter]) -> String {
    params
        .iter()
        .map(ClimateParameter::code)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl ClimateProvider for NasaPowerProvider {
    async fn daily(
        &self,
        location: Location,
        params: &[ClimateParameter],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries> {
        let query = [
            ("parameters", codes(params)),
            ("community", self.community.clone()),
            ("longitude", location.longitude.to_string()),
            ("latitude", location.latitude.to_string()),
            ("start", start.format("%Y%m%d").to_string()),
            ("end", end.format("%Y%m%d").to_string()),
            ("format", "JSON".to_string()),
        ];
        let body = self.get_json("daily/point", &query).await?;
        let series = Self::parse_daily(&body, params)?;
        debug!(%location, params = %codes(params), "NASA POWER daily fetched");
        Ok(series)
    }

    async fn climatology(&self, location: Location, param: ClimateParameter) -> Result<Vec<f64>> {
        let query = [
            ("parameters", param.code().to_string()),
            ("community", self.community.clone()),
            ("longitude", location.longitude.to_string()),
            ("latitude", location.latitude.to_string()),
            ("format", "JSON".to_string()),
        ];
        let body = self.get_json("climatology/point", &query).await?;
        Self::parse_climatology(&body, param)
    }

    fn name(&self) -> &'static str {
        "nasa_power"
    }
}
