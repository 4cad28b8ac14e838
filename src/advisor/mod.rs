//! Recommendation advisor: provider abstraction + file cache + daily limit.
//!
//! Every failure (disabled, limit reached, upstream error) comes back as an
//! `Err`; [`recommendations_for`] folds it into the text of the response.

pub mod prompt;

use std::fs;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::config::AiConfig;
use crate::report::SustainabilityReport;

pub use prompt::build_prompt;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Client used by the report assembler and the HTTP layer.
pub trait RecommendationClient: Send + Sync {
    fn recommend<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynRecommender = Arc<dyn RecommendationClient>;

/// Run the client on a report and always produce text.
pub async fn recommendations_for(
    client: &dyn RecommendationClient,
    report: &SustainabilityReport,
) -> String {
    let prompt = build_prompt(report);
    match client.recommend(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!(provider = client.provider_name(), error = %format!("{e:#}"), "recommendations failed");
            format!("Error generating recommendations: {e:#}")
        }
    }
}

/// Factory: build a client according to config and environment variables.
///
/// * `AI_TEST_MODE=mock` gives a deterministic mock behind the cache.
/// * `enabled == false` gives a disabled client.
/// * Otherwise the configured provider, wrapped with caching + daily limit.
pub fn build_client_from_config(config: &AiConfig) -> DynRecommender {
    build_client_with_cache_dir(config, default_cache_dir())
}

pub fn build_client_with_cache_dir(config: &AiConfig, cache_dir: PathBuf) -> DynRecommender {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let client = CachingClient::new(MockProvider::default(), cache_dir, config.daily_limit);
        return Arc::new(client);
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    let model = config.model.as_deref();
    let built: Result<DynRecommender> = match config.provider.as_str() {
        "gemini" => GeminiProvider::new(&config.api_key, model).map(|p| {
            Arc::new(CachingClient::new(p, cache_dir, config.daily_limit)) as DynRecommender
        }),
        "openai" => OpenAiProvider::new(&config.api_key, model).map(|p| {
            Arc::new(CachingClient::new(p, cache_dir, config.daily_limit)) as DynRecommender
        }),
        other => Err(anyhow!("unsupported recommendation provider: {other}")),
    };
    match built {
        Ok(client) => {
            info!(provider = client.provider_name(), "recommendation client ready");
            client
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "recommendation client unavailable; disabled");
            Arc::new(DisabledClient)
        }
    }
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

/// Low-level provider doing the real remote call. The caching wrapper is
/// shared between production and tests.
pub trait Provider: Send + Sync + 'static {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>>;
    fn name(&self) -> &'static str;
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ))
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(60))
        .build()
        .context("building recommendation http client")
}

fn non_empty_key(api_key: &str, provider: &str) -> Result<String> {
    let key = api_key.trim();
    if key.is_empty() {
        bail!("missing api key for {provider}");
    }
    Ok(key.to_string())
}

/// Google Gemini `generateContent` REST endpoint.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash";

    pub fn new(api_key: &str, model: Option<&str>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: non_empty_key(api_key, "gemini")?,
            model: model.unwrap_or(Self::DEFAULT_MODEL).to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        })
    }

    pub fn parse_response(body: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Content,
        }
        #[derive(Deserialize)]
        struct Content {
            #[serde(default)]
            parts: Vec<Part>,
        }
        #[derive(Deserialize)]
        struct Part {
            #[serde(default)]
            text: String,
        }

        let resp: Resp = serde_json::from_str(body).context("decoding gemini response")?;
        let text: String = resp
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();
        let text = text.trim();
        if text.is_empty() {
            bail!("gemini returned no text");
        }
        Ok(text.to_string())
    }
}

impl Provider for GeminiProvider {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Part<'a> {
                text: &'a str,
            }
            #[derive(Serialize)]
            struct Content<'a> {
                parts: Vec<Part<'a>>,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                contents: Vec<Content<'a>>,
            }

            let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
            let req = Req {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };
            let resp = self
                .http
                .post(url)
                .header("x-goog-api-key", &self.api_key)
                .json(&req)
                .send()
                .await
                .context("gemini request")?;
            let status = resp.status();
            let body = resp.text().await.context("reading gemini response")?;
            if !status.is_success() {
                bail!("gemini returned HTTP {status}");
            }
            Self::parse_response(&body)
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// OpenAI Chat Completions.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";

    pub fn new(api_key: &str, model: Option<&str>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key: non_empty_key(api_key, "openai")?,
            model: model.unwrap_or(Self::DEFAULT_MODEL).to_string(),
        })
    }
}

impl Provider for OpenAiProvider {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let req = Req {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.3,
            };
            let resp = self
                .http
                .post("https://api.openai.com/v1/chat/completions")
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .context("openai request")?;
            let status = resp.status();
            if !status.is_success() {
                bail!("openai returned HTTP {status}");
            }
            let body: Resp = resp.json().await.context("decoding openai response")?;
            let text = body
                .choices
                .first()
                .map(|c| c.message.content.trim().to_string())
                .unwrap_or_default();
            if text.is_empty() {
                bail!("openai returned no text");
            }
            Ok(text)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

/// Used when recommendations are disabled.
pub struct DisabledClient;

impl RecommendationClient for DisabledClient {
    fn recommend<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async { Err(anyhow!("recommendations are disabled")) })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests and local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            fixed: "**Solar Energy:**\n* Install rooftop panels (mock)\n\
                    **Afforestation:**\n* Plant native species (mock)\n\
                    **Water Harvesting:**\n* Build a recharge pit (mock)\n\
                    **Wind Energy:**\n* Commission a wind survey (mock)"
                .to_string(),
        }
    }
}

impl Provider for MockProvider {
    fn generate<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedRecommendation {
    provider: String,
    text: String,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        if let Err(e) = fs::create_dir_all(&cache_dir) {
            warn!(dir = %cache_dir.display(), error = %e, "cannot create recommendation cache dir");
        }
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Real calls made today.
    pub fn calls_today(&self) -> u32 {
        self.counter.lock().map(|g| g.count).unwrap_or(0)
    }

    async fn recommend_impl(&self, prompt: &str) -> Result<String> {
        // Cache hits never count against the limit.
        let key = cache_key(prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(key = %key, "recommendation cache hit");
            return Ok(hit.text);
        }

        // The slot is taken before the remote call so concurrent requests
        // cannot all pass the check; a failed call gives it back.
        self.reserve_slot()?;
        let text = match self.inner.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                self.release_slot();
                return Err(e);
            }
        };

        let cached = CachedRecommendation {
            provider: self.inner.name().to_string(),
            text: text.clone(),
        };
        if let Err(e) = write_cache_file(&self.cache_dir, &key, &cached) {
            warn!(error = %e, "cannot write recommendation cache");
        }
        Ok(text)
    }

    fn reserve_slot(&self) -> Result<()> {
        let mut g = self
            .counter
            .lock()
            .map_err(|_| anyhow!("daily counter lock poisoned"))?;
        if g.is_expired() {
            g.reset_to_today();
        }
        if g.count >= self.daily_limit_max {
            bail!("daily recommendation limit of {} reached", self.daily_limit_max);
        }
        g.count += 1;
        let _ = save_daily_counter(&self.cache_dir, &g);
        Ok(())
    }

    fn release_slot(&self) {
        if let Ok(mut g) = self.counter.lock() {
            g.count = g.count.saturating_sub(1);
            let _ = save_daily_counter(&self.cache_dir, &g);
        }
    }
}

impl<P: Provider> RecommendationClient for CachingClient<P> {
    fn recommend<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(self.recommend_impl(prompt))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/ai")
}

pub fn cache_key(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedRecommendation> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_atomically(path: &Path, contents: &str) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)?;
    fs::rename(tmp, path)
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedRecommendation) -> io::Result<()> {
    let json = serde_json::to_string(value)?;
    write_atomically(&cache_path(dir, key), &json)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let s = serde_json::to_string(dc)?;
    write_atomically(&counter_path(dir), &s)
}
