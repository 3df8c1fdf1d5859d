// src/fetch/retry.rs
//! Retry loop as an explicit state machine.
//!
//! ```text
//! Idle ──start──▶ Attempting ──ok──────────▶ Success
//!                   │   ▲
//!   rate limit /    │   │ delay elapsed
//!   transient       ▼   │
//!             RateLimited | TransientFailure
//!                   │
//!   attempts spent  ▼
//!             FatalFailure ◀──fatal── Attempting
//! ```
//!
//! [`RetryMachine`] holds the transition table and nothing else, so it is
//! testable without any I/O. [`ResilientFetcher`] drives it around an opaque call.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::{FetchError, FetchResult, PriceSnapshot, SeriesProvider, Sleeper, TokioSleeper};

/// Upper bound on a single backoff delay unless `retry_delay` itself is larger.
const MAX_DELAY: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchState {
    Idle,
    Attempting,
    Success,
    RateLimited,
    TransientFailure,
    FatalFailure,
}

impl FetchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FetchState::Success | FetchState::FatalFailure)
    }
}

/// Classification of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    RateLimited,
    Transient,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub retry_delay: Duration,
    /// Growth per further retry; 1.0 keeps the delay constant.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
            backoff_factor: 1.0,
        }
    }
}

impl RetryPolicy {
    /// Sanitizes inputs: at least one attempt, a finite positive factor.
    pub fn new(max_attempts: u32, retry_delay: Duration, backoff_factor: f64) -> Self {
        let backoff_factor = if backoff_factor.is_finite() && backoff_factor > 0.0 {
            backoff_factor
        } else {
            1.0
        };
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            backoff_factor,
        }
    }

    /// Delay after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.retry_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let cap = MAX_DELAY.max(self.retry_delay);
        Duration::try_from_secs_f64(secs).map_or(cap, |d| d.min(cap))
    }
}

/// Transition table for one logical fetch. Attempt counters are per instance.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: FetchState,
    attempts: u32,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: FetchState::Idle,
            attempts: 0,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Idle → Attempting. No delay precedes the first attempt.
    pub fn start(&mut self) -> FetchState {
        if self.state == FetchState::Idle {
            self.attempts = 1;
            self.state = FetchState::Attempting;
        }
        self.state
    }

    /// Attempting → Success | RateLimited | TransientFailure | FatalFailure.
    /// A retryable outcome on the last permitted attempt goes straight to FatalFailure.
    pub fn record(&mut self, outcome: Outcome) -> FetchState {
        if self.state != FetchState::Attempting {
            return self.state;
        }
        let exhausted = self.attempts >= self.policy.max_attempts;
        self.state = match outcome {
            Outcome::Success => FetchState::Success,
            Outcome::Fatal => FetchState::FatalFailure,
            Outcome::RateLimited | Outcome::Transient if exhausted => FetchState::FatalFailure,
            Outcome::RateLimited => FetchState::RateLimited,
            Outcome::Transient => FetchState::TransientFailure,
        };
        self.state
    }

    /// Delay to wait before re-entering Attempting, if a retry is pending.
    pub fn pending_delay(&self) -> Option<Duration> {
        match self.state {
            FetchState::RateLimited | FetchState::TransientFailure => {
                Some(self.policy.delay_after(self.attempts))
            }
            _ => None,
        }
    }

    /// RateLimited | TransientFailure → Attempting after the delay elapsed.
    pub fn delay_elapsed(&mut self) -> FetchState {
        if matches!(
            self.state,
            FetchState::RateLimited | FetchState::TransientFailure
        ) {
            self.attempts += 1;
            self.state = FetchState::Attempting;
        }
        self.state
    }
}

/// Bounded-retry wrapper around an opaque async call.
#[derive(Debug, Clone, Default)]
pub struct ResilientFetcher<S = TokioSleeper> {
    policy: RetryPolicy,
    sleeper: S,
}

impl ResilientFetcher<TokioSleeper> {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sleeper: TokioSleeper,
        }
    }
}

impl<S: Sleeper> ResilientFetcher<S> {
    pub fn with_sleeper(policy: RetryPolicy, sleeper: S) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    /// `op` receives the 1-based attempt number. `label` only feeds logs and
    /// the failure message.
    pub async fn fetch<T, F, Fut>(&self, label: &str, mut op: F) -> FetchResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut machine = RetryMachine::new(self.policy);
        machine.start();

        let last_error = loop {
            let attempt = machine.attempts();
            counter!("fetch_attempts_total").increment(1);
            debug!(target: "fetch", label, attempt, "attempting fetch");

            let e = match op(attempt).await {
                Ok(data) => {
                    machine.record(Outcome::Success);
                    return FetchResult::ok(data, attempt);
                }
                Err(e) => e,
            };

            match &e {
                FetchError::RateLimited(msg) => {
                    counter!("fetch_rate_limited_total").increment(1);
                    warn!(
                        target: "fetch",
                        label,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %msg,
                        "rate limit hit"
                    );
                }
                FetchError::Transient(msg) => {
                    counter!("fetch_transient_errors_total").increment(1);
                    warn!(
                        target: "fetch",
                        label,
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %msg,
                        "fetch attempt failed"
                    );
                }
                FetchError::Fatal(_) => {}
            }

            if machine.record(e.outcome()) == FetchState::FatalFailure {
                break e;
            }
            if let Some(delay) = machine.pending_delay() {
                self.sleeper.sleep(delay).await;
            }
            machine.delay_elapsed();
        };

        let attempts = machine.attempts();
        let message = match last_error {
            FetchError::Fatal(msg) => {
                error!(target: "fetch", label, attempts, error = %msg, "non-retryable fetch failure");
                format!("failed to fetch {label}: {msg}")
            }
            e => {
                counter!("fetch_exhausted_total").increment(1);
                error!(target: "fetch", label, attempts, error = %e, "fetch retries exhausted");
                format!("failed to fetch {label} after {attempts} attempts: {e}")
            }
        };
        FetchResult::failed(message, attempts)
    }

    /// Fetch a price snapshot from `provider` through the retry loop.
    pub async fn fetch_series(
        &self,
        provider: &dyn SeriesProvider,
        symbol: &str,
    ) -> FetchResult<PriceSnapshot> {
        let label = format!("{} from {}", symbol, provider.name());
        self.fetch(&label, |_| provider.fetch_series(symbol)).await
    }
}
