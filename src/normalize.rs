// src/normalize.rs
//! Text cleaning for scoring.
//!
//! Two entry points:
//! - [`TextNormalizer::normalize`]: lower-cased, letters-only, stopword-free token stream.
//! - [`clean_text`]: markup/URL/punctuation stripping that keeps the original case,
//!   used by the direct-lexicon policy before handing text to the polarity model.
//!
//! Neither ever fails; garbage in yields an empty string out.

use anyhow::{Context, Result};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

static ENGLISH: Lazy<Arc<StopWords>> =
    Lazy::new(|| Arc::new(StopWords::parse(include_str!("../data/stopwords_en.txt"))));

/// Immutable stopword set. Built once at startup and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    set: HashSet<String>,
}

impl StopWords {
    /// Built-in English list (NLTK flavour), shared process-wide.
    pub fn english() -> Arc<StopWords> {
        ENGLISH.clone()
    }

    /// One word per line; blank lines and `#` comments are ignored.
    pub fn parse(raw: &str) -> Self {
        let set = raw
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_lowercase)
            .collect();
        Self { set }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading stopwords from {}", path.display()))?;
        Ok(Self::parse(&raw))
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            set: words.into_iter().map(|w| w.as_ref().to_lowercase()).collect(),
        }
    }

    #[inline]
    pub fn contains(&self, word: &str) -> bool {
        self.set.contains(word)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Borrowing normalizer over a shared stopword set.
#[derive(Debug, Clone, Copy)]
pub struct TextNormalizer<'a> {
    stopwords: &'a StopWords,
}

impl<'a> TextNormalizer<'a> {
    pub fn new(stopwords: &'a StopWords) -> Self {
        Self { stopwords }
    }

    /// Lower-case, keep letters and whitespace only, drop stopwords,
    /// rejoin with single spaces.
    pub fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let stripped = strip_markup(text).to_lowercase();
        let letters_only = re_non_letter().replace_all(&stripped, "");

        letters_only
            .split_whitespace()
            .filter(|tok| !self.stopwords.contains(tok))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Cleaning used ahead of the direct-lexicon policy: Markdown links collapse to
/// their label, URLs and HTML go away, punctuation and digits are removed.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let out = strip_markup(text);
    let out = re_non_letter().replace_all(&out, "");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// HTML entities decoded, tags removed, `[label](url)` → `label`, bare URLs removed.
fn strip_markup(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("valid tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    static RE_MD_LINK: OnceCell<Regex> = OnceCell::new();
    let re_md = RE_MD_LINK
        .get_or_init(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").expect("valid markdown link regex"));
    out = re_md.replace_all(&out, "$1").to_string();

    static RE_URL: OnceCell<Regex> = OnceCell::new();
    let re_url = RE_URL.get_or_init(|| Regex::new(r"(?i)\b(?:https?|www)\S+").expect("valid url regex"));
    re_url.replace_all(&out, " ").to_string()
}

fn re_non_letter() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"[^\p{L}\s]").expect("valid letter regex"))
}
