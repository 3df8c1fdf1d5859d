// tests/fetch_retry.rs
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trend_sentiment_engine::fetch::Sleeper;
use trend_sentiment_engine::{FetchError, ResilientFetcher, RetryPolicy};

/// Records requested delays instead of waiting.
#[derive(Clone, Default)]
struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, d: Duration) {
        self.delays.lock().push(d);
    }
}

fn fetcher(sleeper: RecordingSleeper) -> ResilientFetcher<RecordingSleeper> {
    ResilientFetcher::with_sleeper(RetryPolicy::new(3, Duration::from_secs(5), 1.0), sleeper)
}

#[tokio::test]
async fn rate_limited_twice_then_success() {
    let sleeper = RecordingSleeper::default();
    let f = fetcher(sleeper.clone());
    let calls = AtomicU32::new(0);

    let res = f
        .fetch("AAPL", |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(FetchError::RateLimited("429 Too Many Requests".into()))
                } else {
                    Ok(187.25_f64)
                }
            }
        })
        .await;

    assert!(res.success);
    assert_eq!(res.data, Some(187.25));
    assert_eq!(res.error, None);
    assert_eq!(res.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(5); 2]);
}

#[tokio::test]
async fn always_failing_call_is_bounded() {
    let sleeper = RecordingSleeper::default();
    let f = fetcher(sleeper.clone());
    let calls = AtomicU32::new(0);

    let res = f
        .fetch("MSFT", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<f64, _>(FetchError::Transient("connection reset".into())) }
        })
        .await;

    assert!(!res.success);
    assert!(res.data.is_none());
    assert_eq!(res.attempts, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // No delay after the final attempt.
    assert_eq!(sleeper.delays().len(), 2);
    let msg = res.error.unwrap();
    assert!(msg.contains("MSFT"), "{msg}");
    assert!(msg.contains("after 3 attempts"), "{msg}");
    assert!(msg.contains("connection reset"), "{msg}");
}

#[tokio::test]
async fn rate_limit_exhaustion_reports_the_limit() {
    let sleeper = RecordingSleeper::default();
    let f = fetcher(sleeper.clone());

    let res = f
        .fetch("GME", |_| async {
            Err::<(), _>(FetchError::RateLimited("slow down".into()))
        })
        .await;

    assert!(!res.success);
    assert_eq!(res.attempts, 3);
    assert!(res.error.unwrap().contains("rate limit"));
}

#[tokio::test]
async fn fatal_error_stops_immediately() {
    let sleeper = RecordingSleeper::default();
    let f = fetcher(sleeper.clone());
    let calls = AtomicU32::new(0);

    let res = f
        .fetch("??", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<f64, _>(FetchError::Fatal("invalid symbol".into())) }
        })
        .await;

    assert!(!res.success);
    assert_eq!(res.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sleeper.delays().is_empty());
    assert_eq!(res.error.as_deref(), Some("failed to fetch ??: invalid symbol"));
}

#[tokio::test]
async fn single_attempt_policy_never_sleeps() {
    let sleeper = RecordingSleeper::default();
    let f = ResilientFetcher::with_sleeper(
        RetryPolicy::new(1, Duration::from_secs(5), 1.0),
        sleeper.clone(),
    );
    let res = f
        .fetch("TSLA", |_| async {
            Err::<f64, _>(FetchError::Transient("timeout".into()))
        })
        .await;
    assert!(!res.success);
    assert_eq!(res.attempts, 1);
    assert!(sleeper.delays().is_empty());
}

#[tokio::test]
async fn backoff_factor_grows_delays() {
    let sleeper = RecordingSleeper::default();
    let f = ResilientFetcher::with_sleeper(
        RetryPolicy::new(4, Duration::from_secs(2), 2.0),
        sleeper.clone(),
    );
    let _ = f
        .fetch("NVDA", |_| async {
            Err::<f64, _>(FetchError::Transient("503".into()))
        })
        .await;
    assert_eq!(
        sleeper.delays(),
        vec![
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn tokio_sleeper_suspends_between_attempts() {
    let f = ResilientFetcher::new(RetryPolicy::default());
    let started = tokio::time::Instant::now();

    let res = f
        .fetch("SPY", |attempt| async move {
            if attempt == 1 {
                Err(FetchError::RateLimited("429".into()))
            } else {
                Ok(attempt)
            }
        })
        .await;

    assert!(res.success);
    assert_eq!(res.data, Some(2));
    assert!(started.elapsed() >= Duration::from_secs(5));
}

#[tokio::test]
async fn concurrent_fetches_do_not_share_state() {
    let f = Arc::new(fetcher(RecordingSleeper::default()));

    let a = {
        let f = f.clone();
        tokio::spawn(async move {
            f.fetch("A", |attempt| async move {
                if attempt < 2 {
                    Err(FetchError::Transient("flaky".into()))
                } else {
                    Ok("a")
                }
            })
            .await
        })
    };
    let b = {
        let f = f.clone();
        tokio::spawn(async move { f.fetch("B", |_| async { Ok("b") }).await })
    };

    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a.attempts, 2);
    assert_eq!(b.attempts, 1);
    assert_eq!(a.data, Some("a"));
    assert_eq!(b.data, Some("b"));
}
