use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::fetch::{FetchError, PriceSnapshot, SeriesProvider};
use crate::rolling::TrendSeries;

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}
#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}
#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    description: Option<String>,
}
#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Option<Indicators>,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Meta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
}
#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}
#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Daily chart endpoint (`/v8/finance/chart/{symbol}`).
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
    range: String,
}

impl YahooChartProvider {
    pub fn new(base_url: impl Into<String>, range: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("trend-sentiment-engine/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            range: range.into(),
        })
    }

    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        Self::new(
            cfg.base_url.clone(),
            cfg.range.clone(),
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

#[async_trait]
impl SeriesProvider for YahooChartProvider {
    async fn fetch_series(&self, symbol: &str) -> Result<PriceSnapshot, FetchError> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if !is_valid_symbol(&symbol) {
            return Err(FetchError::Fatal(format!("invalid symbol `{symbol}`")));
        }

        let url = format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            symbol
        );
        let resp = self
            .http
            .get(&url)
            .query(&[("range", self.range.as_str()), ("interval", "1d")])
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited(format!(
                "HTTP 429 from {} for {symbol}",
                self.name()
            )));
        }
        if !status.is_success() {
            return Err(FetchError::Transient(format!("HTTP {status} for {symbol}")));
        }

        let body = resp.text().await?;
        parse_chart(&symbol, &body)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

fn is_valid_symbol(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 16
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
}

/// Parse a chart response. A missing current price counts as a transient failure.
pub fn parse_chart(symbol: &str, body: &str) -> Result<PriceSnapshot, FetchError> {
    let env: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| FetchError::Transient(format!("parsing chart for {symbol}: {e}")))?;

    let result = env
        .chart
        .result
        .and_then(|mut v| if v.is_empty() { None } else { Some(v.swap_remove(0)) });
    let Some(result) = result else {
        let why = env
            .chart
            .error
            .and_then(|e| e.description)
            .unwrap_or_else(|| "empty chart result".to_string());
        return Err(FetchError::Transient(format!("{symbol}: {why}")));
    };

    let current_price = result
        .meta
        .regular_market_price
        .ok_or_else(|| FetchError::Transient(format!("could not get current price for {symbol}")))?;

    let closes = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .map(|q| q.close)
        .unwrap_or_default();

    let points = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let date = DateTime::from_timestamp(*ts, 0)?.date_naive();
            close.map(|c| (date, c))
        });

    Ok(PriceSnapshot {
        symbol: symbol.to_string(),
        current_price,
        currency: result.meta.currency.unwrap_or_else(|| "USD".to_string()),
        closes: TrendSeries::from_points(points),
    })
}
