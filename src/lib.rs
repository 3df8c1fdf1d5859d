// src/lib.rs
// Public library surface for the service binary, the CLI and integration tests.

pub mod api;
pub mod config;
pub mod decision;
pub mod engine;
pub mod fetch;
pub mod metrics;
pub mod normalize;
pub mod rolling;
pub mod scoring;
pub mod sentiment;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::config::EngineConfig;
pub use crate::decision::{classify, TrendLabel, TrendResult};
pub use crate::engine::{SentimentEngine, TrendOptions, TrendReport};
pub use crate::fetch::{FetchError, FetchResult, ResilientFetcher, RetryPolicy};
pub use crate::rolling::{aggregate, smooth, TrendSeries};
pub use crate::scoring::{ItemScorer, ScoringPolicy};
pub use crate::types::{ScoredItem, TextItem};

use axum::Router;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the full HTTP app (API + `/metrics`) from the default config resolution.
pub async fn app() -> anyhow::Result<Router> {
    let cfg = EngineConfig::load_default()?;
    let state = api::AppState::from_config(&cfg)?;
    let metrics = metrics::Metrics::init();
    Ok(api::create_router(state).merge(metrics.router()))
}

/// Install the global tracing subscriber. `LOG_FORMAT=json` switches to JSON lines.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trend_sentiment_engine=info,engine=info,fetch=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
