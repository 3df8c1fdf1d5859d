//! decision.rs — Trend label and the result shape handed to rendering/persistence.
//!
//! The label is a pure function of the latest smoothed value; no state is
//! carried between calls and there is no hysteresis.

use serde::{Deserialize, Serialize};

use crate::rolling::TrendSeries;

/// Smoothed sentiment above this is Bullish.
pub const BULLISH_ABOVE: f64 = 0.2;
/// Smoothed sentiment below this is Bearish.
pub const BEARISH_BELOW: f64 = -0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl TrendLabel {
    /// Short human-readable explanation, as shown next to the label.
    pub fn describe(self) -> &'static str {
        match self {
            TrendLabel::Bullish => "Positive sentiment detected",
            TrendLabel::Bearish => "Negative sentiment detected",
            TrendLabel::Neutral => "Mixed sentiment",
        }
    }
}

impl std::fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrendLabel::Bullish => "Bullish",
            TrendLabel::Bearish => "Bearish",
            TrendLabel::Neutral => "Neutral",
        };
        f.write_str(s)
    }
}

/// Absent (or NaN) → Neutral; strict thresholds at ±0.2.
pub fn classify(current_value: Option<f64>) -> TrendLabel {
    match current_value {
        Some(v) if v > BULLISH_ABOVE => TrendLabel::Bullish,
        Some(v) if v < BEARISH_BELOW => TrendLabel::Bearish,
        _ => TrendLabel::Neutral,
    }
}

/// Output of one trend analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub label: TrendLabel,
    /// Last smoothed value; `None` when no day survived the smoothing window.
    pub current_value: Option<f64>,
    pub smoothed_series: TrendSeries,
    /// Unsmoothed daily means the smoothed series was computed from.
    #[serde(default)]
    pub daily_series: TrendSeries,
}

impl TrendResult {
    pub fn from_series(daily_series: TrendSeries, smoothed_series: TrendSeries) -> Self {
        let current_value = smoothed_series.last_value();
        Self {
            label: classify(current_value),
            current_value,
            smoothed_series,
            daily_series,
        }
    }

    pub fn empty() -> Self {
        Self::from_series(TrendSeries::default(), TrendSeries::default())
    }
}
