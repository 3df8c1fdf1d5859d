//! # Trend Engine
//! Pure pipeline from a batch of `TextItem`s to a `TrendResult`:
//! score (policy chosen by the caller) → optional quality filter →
//! daily aggregate → moving average → label.
//!
//! The engine owns the shared read-only resources (polarity model, stopwords)
//! and lends them to the scorer per call. It never mutates caller data.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::EngineConfig;
use crate::decision::TrendResult;
use crate::normalize::{StopWords, TextNormalizer};
use crate::rolling::{aggregate, smooth, DEFAULT_WINDOW};
use crate::scoring::{filter_high_quality, ItemScorer, ScoringPolicy};
use crate::sentiment::{PolarityModel, StaticLexicon, VaderModel};
use crate::types::{ScoredItem, TextItem};

/// How many items the summary lists as top contributors.
const TOP_ITEMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendOptions {
    pub policy: ScoringPolicy,
    pub window_size: usize,
    pub quality_filter: bool,
}

impl TrendOptions {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self {
            policy,
            window_size: DEFAULT_WINDOW,
            quality_filter: false,
        }
    }
}

impl From<&EngineConfig> for TrendOptions {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            policy: cfg.policy,
            window_size: cfg.window_size,
            quality_filter: cfg.quality_filter,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

/// Descriptive statistics of one scored batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub average_sentiment: f64,
    pub item_count: usize,
    pub distribution: Distribution,
    /// Highest popularity first; ties by id.
    pub top_items: Vec<ScoredItem>,
}

/// Trend plus summary for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub trend: TrendResult,
    /// `None` when nothing survived scoring/filtering.
    pub summary: Option<BatchSummary>,
    pub scored: usize,
    pub kept: usize,
}

pub struct SentimentEngine {
    model: Arc<dyn PolarityModel>,
    stopwords: Arc<StopWords>,
}

impl SentimentEngine {
    pub fn new(model: Arc<dyn PolarityModel>, stopwords: Arc<StopWords>) -> Self {
        Self { model, stopwords }
    }

    /// VADER + built-in English stopwords.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(VaderModel::new()), StopWords::english())
    }

    /// Loads optional lexicon/stopword files named in the config.
    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        let model: Arc<dyn PolarityModel> = match &cfg.lexicon_path {
            Some(p) => Arc::new(StaticLexicon::from_path(p)?),
            None => Arc::new(VaderModel::new()),
        };
        let stopwords = match &cfg.stopwords_path {
            Some(p) => Arc::new(StopWords::from_path(p)?),
            None => StopWords::english(),
        };
        info!(
            target: "engine",
            model = model.name(),
            stopwords = stopwords.len(),
            "sentiment engine ready"
        );
        Ok(Self::new(model, stopwords))
    }

    pub fn model(&self) -> &dyn PolarityModel {
        self.model.as_ref()
    }

    pub fn scorer(&self) -> ItemScorer<'_> {
        ItemScorer::new(self.model.as_ref(), &self.stopwords)
    }

    pub fn normalizer(&self) -> TextNormalizer<'_> {
        TextNormalizer::new(&self.stopwords)
    }

    pub fn score_batch(&self, items: &[TextItem], policy: ScoringPolicy) -> Vec<ScoredItem> {
        self.scorer().score_batch(items, policy)
    }

    pub fn analyze_trend(&self, items: &[TextItem], opts: &TrendOptions) -> TrendResult {
        self.analyze(items, opts).trend
    }

    pub fn analyze(&self, items: &[TextItem], opts: &TrendOptions) -> TrendReport {
        let scored = self.score_batch(items, opts.policy);
        let scored_n = scored.len();
        let kept = if opts.quality_filter {
            filter_high_quality(scored)
        } else {
            scored
        };

        let trend = trend_from_scored(&kept, opts.window_size);
        info!(
            target: "engine",
            items = scored_n,
            kept = kept.len(),
            days = trend.daily_series.len(),
            label = %trend.label,
            "trend analyzed"
        );

        TrendReport {
            summary: summarize(&kept),
            trend,
            scored: scored_n,
            kept: kept.len(),
        }
    }
}

/// Aggregate, smooth and classify an already scored batch.
pub fn trend_from_scored(scored: &[ScoredItem], window_size: usize) -> TrendResult {
    let daily = aggregate(scored);
    let smoothed = smooth(&daily, window_size);
    TrendResult::from_series(daily, smoothed)
}

/// Average, sign distribution and top items by popularity. `None` for an empty batch.
pub fn summarize(scored: &[ScoredItem]) -> Option<BatchSummary> {
    if scored.is_empty() {
        return None;
    }

    let mut sentiments: Vec<f64> = scored.iter().map(|s| s.sentiment).collect();
    sentiments.sort_by(f64::total_cmp);
    let average_sentiment = sentiments.iter().sum::<f64>() / sentiments.len() as f64;

    let mut distribution = Distribution::default();
    for s in scored {
        if s.sentiment > 0.0 {
            distribution.positive += 1;
        } else if s.sentiment < 0.0 {
            distribution.negative += 1;
        } else {
            distribution.neutral += 1;
        }
    }

    let mut top: Vec<&ScoredItem> = scored.iter().collect();
    top.sort_by(|a, b| {
        b.item
            .popularity
            .cmp(&a.item.popularity)
            .then_with(|| a.item.id.cmp(&b.item.id))
    });

    Some(BatchSummary {
        average_sentiment,
        item_count: scored.len(),
        distribution,
        top_items: top.into_iter().take(TOP_ITEMS).cloned().collect(),
    })
}
