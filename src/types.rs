// src/types.rs
//! Batch records flowing through the engine: raw `TextItem`s from a provider
//! and the derived `ScoredItem`s. Boundary validation lives here as well;
//! nothing past `parse_batch` ever sees an item without a timestamp.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// One unit of short-form text (post, headline, article).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextItem {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub body: String,
    /// Source-defined score (e.g. upvotes); may be negative.
    #[serde(default)]
    pub popularity: i64,
    #[serde(deserialize_with = "flexible_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Subreddit, outlet, feed name ...
    #[serde(default, deserialize_with = "lenient_text")]
    pub source_tag: String,
}

impl TextItem {
    /// Title and body joined by a single space; empty parts are skipped.
    pub fn text(&self) -> String {
        [self.title.as_str(), self.body.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `TextItem` plus its derived scores. Built once by the scorer, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: TextItem,
    /// Stopword-free lemma stream of the item text.
    pub normalized: String,
    pub sentiment: f64,
    /// Present only under the composite-quality policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
}

/// Rejections raised at the batch boundary. Scoring itself never fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("item #{index} has no timestamp")]
    MissingTimestamp { index: usize },
    #[error("duplicate item id `{0}` in batch")]
    DuplicateId(String),
    #[error("malformed item #{index}: {message}")]
    Malformed { index: usize, message: String },
    #[error("batch is not a JSON array: {0}")]
    NotAnArray(String),
}

/// Parse a JSON array of items, rejecting anything the core must not see.
pub fn parse_batch(json: &str) -> Result<Vec<TextItem>, InputError> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| InputError::NotAnArray(e.to_string()))?;
    parse_items(raw)
}

/// Same as [`parse_batch`] for already decoded JSON values.
pub fn parse_items(raw: Vec<serde_json::Value>) -> Result<Vec<TextItem>, InputError> {
    let mut items = Vec::with_capacity(raw.len());
    for (index, v) in raw.into_iter().enumerate() {
        let has_ts = v.get("timestamp").is_some_and(|t| !t.is_null());
        if !has_ts {
            return Err(InputError::MissingTimestamp { index });
        }
        let item: TextItem = serde_json::from_value(v).map_err(|e| InputError::Malformed {
            index,
            message: e.to_string(),
        })?;
        items.push(item);
    }

    validate_batch(&items)?;
    Ok(items)
}

/// Enforce per-batch id uniqueness.
pub fn validate_batch(items: &[TextItem]) -> Result<(), InputError> {
    let mut seen = HashSet::with_capacity(items.len());
    for it in items {
        if !seen.insert(it.id.as_str()) {
            return Err(InputError::DuplicateId(it.id.clone()));
        }
    }
    Ok(())
}

/// Accepts any JSON value; anything that is not a string becomes "".
fn lenient_text<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Other(serde::de::IgnoredAny),
    }
    Ok(match Lenient::deserialize(de)? {
        Lenient::Text(s) => s,
        Lenient::Other(_) => String::new(),
    })
}

/// Providers hand out both string and numeric ids.
fn lenient_id<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Uint(u64),
    }
    Ok(match Id::deserialize(de)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Uint(n) => n.to_string(),
    })
}

/// RFC 3339 string or unix seconds (fractional allowed, as Reddit's `created_utc`).
fn flexible_timestamp<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ts {
        Rfc3339(DateTime<Utc>),
        Unix(f64),
    }
    match Ts::deserialize(de)? {
        Ts::Rfc3339(dt) => Ok(dt),
        Ts::Unix(secs) => {
            let whole = secs.floor();
            let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
            Utc.timestamp_opt(whole as i64, nanos)
                .single()
                .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_text_fields_coerce_to_empty() {
        let v = json!({
            "id": 7,
            "title": null,
            "body": 42,
            "timestamp": 1_700_000_000,
        });
        let it: TextItem = serde_json::from_value(v).unwrap();
        assert_eq!(it.id, "7");
        assert_eq!(it.title, "");
        assert_eq!(it.body, "");
        assert_eq!(it.popularity, 0);
        assert_eq!(it.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn text_joins_non_empty_parts() {
        let v = json!({"id": "a", "title": "Up", "body": "", "timestamp": "2024-03-01T10:00:00Z"});
        let it: TextItem = serde_json::from_value(v).unwrap();
        assert_eq!(it.text(), "Up");
    }

    #[test]
    fn batch_without_timestamp_is_rejected() {
        let raw = r#"[{"id":"a","timestamp":"2024-03-01T10:00:00Z"},{"id":"b","title":"x"}]"#;
        assert_eq!(
            parse_batch(raw),
            Err(InputError::MissingTimestamp { index: 1 })
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"[
            {"id":"a","timestamp":"2024-03-01T10:00:00Z"},
            {"id":"a","timestamp":"2024-03-02T10:00:00Z"}
        ]"#;
        assert_eq!(parse_batch(raw), Err(InputError::DuplicateId("a".into())));
    }
}
