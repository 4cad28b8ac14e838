//! Sustainability analyzer: binary entrypoint.
//! Boots the Axum HTTP server with the report assembler and `/metrics`.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;

use sustainability_analyzer::config::{ai::DEFAULT_AI_CONFIG_PATH, AiConfig, Settings};
use sustainability_analyzer::metrics::Metrics;
use sustainability_analyzer::{build_assembler, create_router, init_tracing, AppState};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::load().context("loading sustainability settings")?;
    let ai = AiConfig::load_or_default(DEFAULT_AI_CONFIG_PATH);

    let metrics = Metrics::init(settings.cache.max_entries)?;
    let assembler = build_assembler(&settings, &ai).context("building report assembler")?;

    let router = create_router(AppState::new(assembler), &settings.server).merge(metrics.router());
    info!(origins = ?settings.server.allowed_origins, "sustainability analyzer ready");

    Ok(router.into())
}
