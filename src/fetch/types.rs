// src/fetch/types.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::FetchError;
use crate::rolling::TrendSeries;

/// Latest quote plus a short daily close history for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub current_price: f64,
    pub currency: String,
    #[serde(default)]
    pub closes: TrendSeries,
}

/// One opaque call to a numeric-series provider. Implementations classify
/// their failures; they never retry on their own.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    async fn fetch_series(&self, symbol: &str) -> Result<PriceSnapshot, FetchError>;
    fn name(&self) -> &'static str;
}
