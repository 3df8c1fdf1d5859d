//! # Rolling Trend Series
//! Daily resampling and simple moving average over scored items.
//!
//! Days without items are absent from the series: they are neither zero-filled
//! nor interpolated, and the moving average only ever looks at present days.
//! Everything here is a pure function of its input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::ScoredItem;

/// Default smoothing window, in present daily entries.
pub const DEFAULT_WINDOW: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Chronologically ordered `(date, value)` pairs, at most one per calendar day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrendSeries {
    points: Vec<TrendPoint>,
}

impl TrendSeries {
    /// Build from arbitrary points; sorts by date, last value wins on duplicate dates.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let map: BTreeMap<NaiveDate, f64> = points.into_iter().collect();
        Self {
            points: map
                .into_iter()
                .map(|(date, value)| TrendPoint { date, value })
                .collect(),
        }
    }

    pub fn points(&self) -> &[TrendPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.value)
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].value)
    }
}

/// Mean sentiment per UTC calendar day.
///
/// Sentiments within a day are summed in sorted order, so the output is
/// bit-identical for any permutation of `items`.
pub fn aggregate(items: &[ScoredItem]) -> TrendSeries {
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for s in items {
        by_day
            .entry(s.item.timestamp.date_naive())
            .or_default()
            .push(s.sentiment);
    }

    let points = by_day
        .into_iter()
        .map(|(date, mut vals)| {
            vals.sort_by(f64::total_cmp);
            let mean = vals.iter().sum::<f64>() / vals.len() as f64;
            TrendPoint { date, value: mean }
        })
        .collect();

    TrendSeries { points }
}

/// Simple moving average over the last `window_size` present entries.
///
/// The first `window_size - 1` entries have no smoothed value and are omitted.
/// A window of 0 is treated as 1.
pub fn smooth(series: &TrendSeries, window_size: usize) -> TrendSeries {
    let w = window_size.max(1);
    if series.len() < w {
        return TrendSeries::default();
    }

    let points = series
        .points
        .windows(w)
        .map(|win| {
            let sum: f64 = win.iter().map(|p| p.value).sum();
            TrendPoint {
                date: win[w - 1].date,
                value: sum / w as f64,
            }
        })
        .collect();

    TrendSeries { points }
}
