// src/fetch/mod.rs
//! External series fetching with bounded retry.
//!
//! Providers classify the outcome of one opaque call as a [`FetchError`] kind;
//! [`ResilientFetcher`] drives the [`RetryMachine`] over repeated attempts and
//! hands the caller a [`FetchResult`] value, never a propagated error.

pub mod providers;
pub mod retry;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use retry::{FetchState, Outcome, ResilientFetcher, RetryMachine, RetryPolicy};
pub use types::{PriceSnapshot, SeriesProvider};

/// Failure of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Provider explicitly signalled a rate limit (e.g. HTTP 429).
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
    /// Any other failure of the call; retried like a rate limit.
    #[error("{0}")]
    Transient(String),
    /// The operation declared the failure non-retryable.
    #[error("{0}")]
    Fatal(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::Fatal(_))
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            FetchError::RateLimited(_) => Outcome::RateLimited,
            FetchError::Transient(_) => Outcome::Transient,
            FetchError::Fatal(_) => Outcome::Fatal,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(s) if s.as_u16() == 429 => FetchError::RateLimited(e.to_string()),
            _ => FetchError::Transient(e.to_string()),
        }
    }
}

/// Uniform `{success, data | error}` shape returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Attempts actually made.
    pub attempts: u32,
}

impl<T> FetchResult<T> {
    pub fn ok(data: T, attempts: u32) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            attempts,
        }
    }

    pub fn failed(error: impl Into<String>, attempts: u32) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            attempts,
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| "unknown fetch failure".to_string())),
        }
    }
}

/// Wait between attempts. Injected so tests can observe delays without sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Suspends the calling task on the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
