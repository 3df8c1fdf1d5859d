//! Trend Sentiment Service — Binary Entrypoint
//! Boots the Axum HTTP server with the engine, the price provider and `/metrics`.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    trend_sentiment_engine::init_tracing();

    let router = trend_sentiment_engine::app().await?;

    Ok(router.into())
}
