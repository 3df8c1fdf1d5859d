use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::config::EngineConfig;
use crate::decision::TrendResult;
use crate::engine::{BatchSummary, SentimentEngine, TrendOptions};
use crate::fetch::providers::YahooChartProvider;
use crate::fetch::{FetchResult, PriceSnapshot, ResilientFetcher, RetryPolicy, SeriesProvider};
use crate::scoring::ScoringPolicy;
use crate::types::parse_items;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<SentimentEngine>,
    provider: Arc<dyn SeriesProvider>,
    retry: RetryPolicy,
    defaults: TrendOptions,
}

impl AppState {
    pub fn new(
        engine: Arc<SentimentEngine>,
        provider: Arc<dyn SeriesProvider>,
        retry: RetryPolicy,
        defaults: TrendOptions,
    ) -> Self {
        Self {
            engine,
            provider,
            retry,
            defaults,
        }
    }

    /// Engine resources + Yahoo chart provider from config.
    pub fn from_config(cfg: &EngineConfig) -> anyhow::Result<Self> {
        let engine = SentimentEngine::from_config(cfg)?;
        let provider = YahooChartProvider::from_config(&cfg.provider)?;
        Ok(Self::new(
            Arc::new(engine),
            Arc::new(provider),
            cfg.fetch.retry_policy(),
            TrendOptions::from(cfg),
        ))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/analyze", post(analyze))
        .route("/score", post(score))
        .route("/quote/{symbol}", get(quote))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct AnalyzeReq {
    #[serde(default)]
    query: String,
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    policy: Option<ScoringPolicy>,
    #[serde(default)]
    window_size: Option<usize>,
    #[serde(default)]
    quality_filter: Option<bool>,
}

#[derive(Serialize)]
struct AnalyzeResp {
    success: bool,
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    trend: TrendResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<BatchSummary>,
    scored: usize,
    kept: usize,
}

#[derive(Serialize)]
struct ErrorResp {
    success: bool,
    error: String,
}

async fn analyze(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeReq>,
) -> Result<Json<AnalyzeResp>, (StatusCode, Json<ErrorResp>)> {
    let items = parse_items(body.items).map_err(|e| {
        tracing::info!(error = %e, query = %body.query, "rejected batch");
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResp {
                success: false,
                error: e.to_string(),
            }),
        )
    })?;

    let opts = TrendOptions {
        policy: body.policy.unwrap_or(state.defaults.policy),
        window_size: body
            .window_size
            .unwrap_or(state.defaults.window_size)
            .max(1),
        quality_filter: body.quality_filter.unwrap_or(state.defaults.quality_filter),
    };

    let report = state.engine.analyze(&items, &opts);
    let error = report
        .summary
        .is_none()
        .then(|| format!("no items found for {}", body.query));

    Ok(Json(AnalyzeResp {
        success: error.is_none(),
        query: body.query,
        error,
        trend: report.trend,
        summary: report.summary,
        scored: report.scored,
        kept: report.kept,
    }))
}

#[derive(Deserialize)]
struct ScoreReq {
    #[serde(default)]
    text: serde_json::Value,
}

#[derive(Serialize)]
struct ScoreResp {
    sentiment: f64,
    normalized: String,
}

/// Direct-lexicon score of one ad-hoc text. Non-string input scores as empty.
async fn score(State(state): State<AppState>, Json(body): Json<ScoreReq>) -> Json<ScoreResp> {
    let text = body.text.as_str().unwrap_or_default();
    Json(ScoreResp {
        sentiment: state.engine.scorer().score_sentiment_simple(text),
        normalized: state.engine.normalizer().normalize(text),
    })
}

/// Each request drives its own retry loop; nothing is shared between symbols.
async fn quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Json<FetchResult<PriceSnapshot>> {
    let fetcher = ResilientFetcher::new(state.retry);
    Json(fetcher.fetch_series(state.provider.as_ref(), &symbol).await)
}
