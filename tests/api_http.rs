// tests/api_http.rs
use async_trait::async_trait;
use axum::body::{self, Body};
use axum::Router;
use chrono::NaiveDate;
use http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt; // for `oneshot`

use trend_sentiment_engine::api::{create_router, AppState};
use trend_sentiment_engine::fetch::{PriceSnapshot, SeriesProvider};
use trend_sentiment_engine::normalize::StopWords;
use trend_sentiment_engine::sentiment::StaticLexicon;
use trend_sentiment_engine::{
    FetchError, RetryPolicy, ScoringPolicy, SentimentEngine, TrendOptions, TrendSeries,
};

/// Rate-limits the first `fail_first` calls, then serves a fixed snapshot.
struct FlakyProvider {
    calls: AtomicU32,
    fail_first: u32,
}

#[async_trait]
impl SeriesProvider for FlakyProvider {
    async fn fetch_series(&self, symbol: &str) -> Result<PriceSnapshot, FetchError> {
        if symbol == "BAD" {
            return Err(FetchError::Fatal(format!("invalid symbol {symbol}")));
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.fail_first {
            return Err(FetchError::RateLimited("429".into()));
        }
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        Ok(PriceSnapshot {
            symbol: symbol.to_string(),
            current_price: 412.5,
            currency: "USD".into(),
            closes: TrendSeries::from_points([(d(3), 410.0), (d(4), 412.5)]),
        })
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

fn build_app(fail_first: u32) -> Router {
    let lexicon =
        StaticLexicon::from_json(r#"{"great": 3.0, "love": 3.2, "awful": -3.1, "crash": -2.5}"#)
            .unwrap();
    let engine = SentimentEngine::new(Arc::new(lexicon), StopWords::english());
    let provider = FlakyProvider {
        calls: AtomicU32::new(0),
        fail_first,
    };
    let state = AppState::new(
        Arc::new(engine),
        Arc::new(provider),
        RetryPolicy::new(3, Duration::ZERO, 1.0),
        TrendOptions::new(ScoringPolicy::CompositeQuality),
    );
    create_router(state)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.expect("request failed");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let v = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, v)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

#[tokio::test]
async fn health_ok() {
    let resp = build_app(0).oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn analyze_bullish_week() {
    let items: Vec<Value> = (1..=8)
        .map(|d| {
            json!({
                "id": format!("p{d}"),
                "title": "Great earnings",
                "body": "love this company",
                "popularity": d * 3,
                "timestamp": format!("2024-06-{d:02}T14:00:00Z"),
                "source_tag": "stocks",
            })
        })
        .collect();

    let (status, v) = send(
        build_app(0),
        post_json(
            "/analyze",
            json!({"query": "AAPL", "items": items, "policy": "direct_lexicon"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], true);
    assert_eq!(v["query"], "AAPL");
    assert_eq!(v["trend"]["label"], "Bullish");
    assert_eq!(v["trend"]["daily_series"].as_array().unwrap().len(), 8);
    assert_eq!(v["trend"]["smoothed_series"].as_array().unwrap().len(), 2);
    assert_eq!(v["summary"]["item_count"], 8);
    assert_eq!(v["summary"]["top_items"].as_array().unwrap().len(), 5);
    assert_eq!(v["summary"]["top_items"][0]["id"], "p8");
}

#[tokio::test]
async fn analyze_empty_batch_reports_no_items() {
    let (status, v) = send(
        build_app(0),
        post_json("/analyze", json!({"query": "TSLA", "items": []})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"], "no items found for TSLA");
    assert_eq!(v["trend"]["label"], "Neutral");
    assert!(v["trend"]["current_value"].is_null());
}

#[tokio::test]
async fn analyze_rejects_duplicate_ids() {
    let items = json!([
        {"id": "x", "title": "crash", "timestamp": "2024-06-01T10:00:00Z"},
        {"id": "x", "title": "awful", "timestamp": "2024-06-02T10:00:00Z"},
    ]);
    let (status, v) = send(
        build_app(0),
        post_json("/analyze", json!({"query": "GME", "items": items})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(v["success"], false);
    assert!(v["error"].as_str().unwrap().contains("duplicate"));
}

#[tokio::test]
async fn analyze_rejects_missing_timestamp() {
    let items = json!([{"id": "only", "title": "great"}]);
    let (status, v) = send(
        build_app(0),
        post_json("/analyze", json!({"query": "GME", "items": items})),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(v["error"].as_str().unwrap().contains("timestamp"));
}

#[tokio::test]
async fn score_non_string_text_is_zero() {
    let (status, v) = send(build_app(0), post_json("/score", json!({"text": 12345}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["sentiment"], 0.0);
    assert_eq!(v["normalized"], "");

    let (_, v) = send(
        build_app(0),
        post_json("/score", json!({"text": "What an awful crash"})),
    )
    .await;
    assert!(v["sentiment"].as_f64().unwrap() < 0.0);
    assert_eq!(v["normalized"], "awful crash");
}

#[tokio::test]
async fn quote_retries_through_rate_limit() {
    let (status, v) = send(build_app(2), get("/quote/MSFT")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], true);
    assert_eq!(v["attempts"], 3);
    assert_eq!(v["data"]["symbol"], "MSFT");
    assert_eq!(v["data"]["current_price"], 412.5);
    assert_eq!(v["data"]["closes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn quote_failure_is_a_value_not_an_error() {
    let (status, v) = send(build_app(10), get("/quote/MSFT")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], false);
    assert_eq!(v["attempts"], 3);
    assert!(v.get("data").is_none());
    assert!(v["error"].as_str().unwrap().contains("after 3 attempts"));

    let (_, v) = send(build_app(0), get("/quote/BAD")).await;
    assert_eq!(v["success"], false);
    assert_eq!(v["attempts"], 1);
}
