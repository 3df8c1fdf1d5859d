// src/sentiment.rs
//! Lexicon polarity models.
//!
//! The engine treats the polarity model as a read-only black box loaded once at
//! startup and shared by reference. Two implementations ship:
//! - [`VaderModel`]: the VADER lexicon/rule set (default).
//! - [`StaticLexicon`]: a plain word → valence JSON map with short-range negation,
//!   handy for domain lexicons and deterministic fixtures.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// VADER's normalization constant for mapping a raw valence sum into (-1, 1).
const NORMALIZE_ALPHA: f64 = 15.0;

/// Polarity breakdown of one text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Polarity {
    pub compound: f64,
    pub pos: f64,
    pub neg: f64,
    pub neu: f64,
}

/// Read-only polarity scorer; must be safe for concurrent reads.
pub trait PolarityModel: Send + Sync {
    fn polarity(&self, text: &str) -> Polarity;

    /// Shortcut for the compound score only.
    fn compound(&self, text: &str) -> f64 {
        self.polarity(text).compound
    }

    fn name(&self) -> &'static str;
}

/// VADER (Valence Aware Dictionary and sEntiment Reasoner).
pub struct VaderModel {
    analyzer: vader_sentiment::SentimentIntensityAnalyzer<'static>,
}

impl VaderModel {
    pub fn new() -> Self {
        Self {
            analyzer: vader_sentiment::SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VaderModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaderModel").finish_non_exhaustive()
    }
}

impl PolarityModel for VaderModel {
    fn polarity(&self, text: &str) -> Polarity {
        if text.trim().is_empty() {
            return Polarity::default();
        }
        let scores = self.analyzer.polarity_scores(text);
        let get = |k: &str| scores.get(k).copied().unwrap_or(0.0);
        Polarity {
            compound: get("compound"),
            pos: get("pos"),
            neg: get("neg"),
            neu: get("neu"),
        }
    }

    fn name(&self) -> &'static str {
        "vader"
    }
}

/// Word-valence lexicon loaded from JSON (`{"surge": 2.1, "crash": -3.0, ...}`).
#[derive(Debug, Clone, Default)]
pub struct StaticLexicon {
    words: HashMap<String, f64>,
}

impl StaticLexicon {
    pub fn from_map(words: HashMap<String, f64>) -> Self {
        let words = words
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        Self { words }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let words: HashMap<String, f64> =
            serde_json::from_str(raw).context("parsing lexicon json")?;
        Ok(Self::from_map(words))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading lexicon from {}", path.display()))?;
        Self::from_json(&raw)
    }

    #[inline]
    fn word_valence(&self, w: &str) -> f64 {
        self.words.get(w).copied().unwrap_or(0.0)
    }
}

impl PolarityModel for StaticLexicon {
    /// Sums token valences; a negator within the previous three tokens flips
    /// the sign of a scored word.
    fn polarity(&self, text: &str) -> Polarity {
        let tokens: Vec<String> = tokenize(text).collect();
        if tokens.is_empty() {
            return Polarity::default();
        }

        let mut sum = 0.0f64;
        let mut pos_sum = 0.0f64;
        let mut neg_sum = 0.0f64;
        let mut neu_count = 0usize;

        for i in 0..tokens.len() {
            let base = self.word_valence(tokens[i].as_str());
            if base == 0.0 {
                neu_count += 1;
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            let v = if negated { -base } else { base };
            sum += v;
            if v > 0.0 {
                pos_sum += v + 1.0;
            } else {
                neg_sum += v.abs() + 1.0;
            }
        }

        let total = pos_sum + neg_sum + neu_count as f64;
        let compound = sum / (sum * sum + NORMALIZE_ALPHA).sqrt();
        Polarity {
            compound,
            pos: pos_sum / total,
            neg: neg_sum / total,
            neu: neu_count as f64 / total,
        }
    }

    fn name(&self) -> &'static str {
        "static-lexicon"
    }
}

/// Alphanumeric tokens (apostrophes kept inside words), lower-case.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "without"
    )
}
