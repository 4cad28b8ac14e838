use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metric descriptions (so series show up with help text on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "signal_fetch_total",
            "Upstream signal fetches by kind, provider and outcome."
        );
        describe_counter!("signal_cache_hits_total", "Provider cache hits by kind.");
        describe_counter!("signal_cache_misses_total", "Provider cache misses by kind.");
        describe_histogram!(
            "forecast_train_ms",
            "Solar model training and prediction time in milliseconds."
        );
        describe_counter!("report_requests_total", "Sustainability reports requested.");
        describe_gauge!(
            "signal_cache_max_entries",
            "Configured bound of each provider cache."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the cache bound.
    pub fn init(cache_max_entries: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        gauge!("signal_cache_max_entries").set(cache_max_entries as f64);
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
