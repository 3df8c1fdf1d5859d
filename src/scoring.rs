//! Per-item scoring.
//!
//! Two policies coexist and the caller always picks one explicitly:
//!
//! - `CompositeQuality`: sentiment = 0.7*compound + 0.1*(len/1000) - 0.1*[has '?'] + 0.1*[has '!'],
//!   plus a quality score = 0.3*[body > 100 chars] + 0.3*[popularity > 10] + 0.4*|compound(body)|.
//! - `DirectLexicon`: sentiment = compound of the cleaned text; no quality score.
//!
//! Neither policy clamps its output and neither fails on odd input.

use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::normalize::{clean_text, StopWords, TextNormalizer};
use crate::sentiment::PolarityModel;
use crate::types::{ScoredItem, TextItem};

/// Items with quality strictly above this pass the quality filter.
pub const QUALITY_THRESHOLD: f64 = 0.5;

const LONG_BODY_CHARS: usize = 100;
const POPULAR_MIN: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    CompositeQuality,
    DirectLexicon,
}

impl std::str::FromStr for ScoringPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "composite_quality" | "composite" | "a" => Ok(Self::CompositeQuality),
            "direct_lexicon" | "direct" | "simple" | "b" => Ok(Self::DirectLexicon),
            other => anyhow::bail!("unknown scoring policy: {other}"),
        }
    }
}

/// Scorer borrowing the shared model and stopword set.
#[derive(Clone, Copy)]
pub struct ItemScorer<'a> {
    model: &'a dyn PolarityModel,
    normalizer: TextNormalizer<'a>,
}

impl<'a> ItemScorer<'a> {
    pub fn new(model: &'a dyn PolarityModel, stopwords: &'a StopWords) -> Self {
        Self {
            model,
            normalizer: TextNormalizer::new(stopwords),
        }
    }

    /// Quality of the raw item. Unclamped sum, typically within [0, 1].
    pub fn score_quality(&self, item: &TextItem) -> f64 {
        let mut q = 0.0;
        if item.body.chars().count() > LONG_BODY_CHARS {
            q += 0.3;
        }
        if item.popularity > POPULAR_MIN {
            q += 0.3;
        }
        q + 0.4 * self.model.compound(&item.body).abs()
    }

    pub fn is_high_quality(&self, item: &TextItem) -> bool {
        self.score_quality(item) > QUALITY_THRESHOLD
    }

    /// The length term grows without bound; long texts can leave [-1, 1].
    pub fn score_sentiment_composite(&self, text: &str) -> f64 {
        let compound = self.model.compound(text);
        let len_term = text.chars().count() as f64 / 1000.0;
        let question = if text.contains('?') { 1.0 } else { 0.0 };
        let exclamation = if text.contains('!') { 1.0 } else { 0.0 };

        0.7 * compound + 0.1 * len_term - 0.1 * question + 0.1 * exclamation
    }

    pub fn score_sentiment_simple(&self, text: &str) -> f64 {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return 0.0;
        }
        self.model.compound(&cleaned)
    }

    pub fn score(&self, item: &TextItem, policy: ScoringPolicy) -> ScoredItem {
        let text = item.text();
        let (sentiment, quality) = match policy {
            ScoringPolicy::CompositeQuality => (
                self.score_sentiment_composite(&text),
                Some(self.score_quality(item)),
            ),
            ScoringPolicy::DirectLexicon => (self.score_sentiment_simple(&text), None),
        };

        ScoredItem {
            item: item.clone(),
            normalized: self.normalizer.normalize(&text),
            sentiment,
            quality,
        }
    }

    pub fn score_batch(&self, items: &[TextItem], policy: ScoringPolicy) -> Vec<ScoredItem> {
        let out: Vec<ScoredItem> = items.iter().map(|it| self.score(it, policy)).collect();
        counter!("items_scored_total").increment(out.len() as u64);
        out
    }
}

/// Keep items whose quality beats [`QUALITY_THRESHOLD`]. Items scored without
/// a quality value pass through.
pub fn filter_high_quality(scored: Vec<ScoredItem>) -> Vec<ScoredItem> {
    let before = scored.len();
    let kept: Vec<ScoredItem> = scored
        .into_iter()
        .filter(|s| s.quality.is_none_or(|q| q > QUALITY_THRESHOLD))
        .collect();
    counter!("items_quality_filtered_total").increment((before - kept.len()) as u64);
    kept
}
