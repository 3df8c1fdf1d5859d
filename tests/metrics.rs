// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn metrics_endpoint_contains_scoring_series() {
    let app = trend_sentiment_engine::app()
        .await
        .expect("app() should build Router in tests");

    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"query":"SPY","items":[{"id":"1","title":"Markets rally on strong jobs data","timestamp":"2024-06-03T13:30:00Z"}]}"#,
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("items_scored_total"), "exposition:\n{text}");
}
