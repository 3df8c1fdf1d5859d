use axum::{routing::get, Router};
use metrics::{describe_counter, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder once per process and describe all series.
    /// If another recorder is already installed, a detached handle is returned
    /// (it renders an empty exposition).
    pub fn init() -> Self {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(h) => {
                    describe_all();
                    h
                }
                Err(e) => {
                    tracing::warn!(error = %e, "prometheus recorder not installed");
                    PrometheusBuilder::new().build_recorder().handle()
                }
            })
            .clone();
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
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

fn describe_all() {
    describe_counter!("items_scored_total", Unit::Count, "Text items scored.");
    describe_counter!(
        "items_quality_filtered_total",
        Unit::Count,
        "Scored items dropped by the quality filter."
    );
    describe_counter!("fetch_attempts_total", Unit::Count, "External fetch attempts.");
    describe_counter!(
        "fetch_rate_limited_total",
        Unit::Count,
        "Fetch attempts rejected with an explicit rate limit."
    );
    describe_counter!(
        "fetch_transient_errors_total",
        Unit::Count,
        "Fetch attempts failed with a retryable error."
    );
    describe_counter!(
        "fetch_exhausted_total",
        Unit::Count,
        "Fetches that used up all attempts."
    );
}
