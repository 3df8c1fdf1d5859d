// src/config/mod.rs
//! Engine configuration.
//!
//! Resolution order:
//! 1) `$TREND_CONFIG_PATH` (TOML or JSON, by extension)
//! 2) `config/engine.toml`
//! 3) `config/engine.json`
//! 4) built-in defaults
//!
//! Then `TREND_*` env overrides are applied and values are sanitized.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::fetch::RetryPolicy;
use crate::rolling::DEFAULT_WINDOW;
use crate::scoring::ScoringPolicy;

pub const ENV_CONFIG_PATH: &str = "TREND_CONFIG_PATH";
const ENV_WINDOW_SIZE: &str = "TREND_WINDOW_SIZE";
const ENV_QUALITY_FILTER: &str = "TREND_QUALITY_FILTER";
const ENV_FETCH_MAX_ATTEMPTS: &str = "TREND_FETCH_MAX_ATTEMPTS";
const ENV_FETCH_RETRY_DELAY: &str = "TREND_FETCH_RETRY_DELAY_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Smoothing window in present daily entries.
    pub window_size: usize,
    /// Drop items at or below the quality threshold before aggregation.
    pub quality_filter: bool,
    pub policy: ScoringPolicy,
    /// Stopword list (one word per line); built-in English list when absent.
    pub stopwords_path: Option<PathBuf>,
    /// JSON word→valence lexicon; VADER when absent.
    pub lexicon_path: Option<PathBuf>,
    pub fetch: FetchConfig,
    pub provider: ProviderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW,
            quality_filter: false,
            policy: ScoringPolicy::CompositeQuality,
            stopwords_path: None,
            lexicon_path: None,
            fetch: FetchConfig::default(),
            provider: ProviderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    pub backoff_factor: f64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_secs: 5,
            backoff_factor: 1.0,
        }
    }
}

impl FetchConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_secs(self.retry_delay_secs),
            self.backoff_factor,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Chart history range, e.g. "1mo".
    pub range: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            range: "1mo".to_string(),
            timeout_secs: 10,
        }
    }
}

impl EngineConfig {
    /// Load from an explicit path. Format picked by extension (`.json`, else TOML).
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: EngineConfig = if ext == "json" {
            serde_json::from_str(&content).context("parsing engine config json")?
        } else {
            toml::from_str(&content).context("parsing engine config toml")?
        };
        Ok(cfg.sanitized())
    }

    /// File resolution + env overrides, see module docs.
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let toml_p = PathBuf::from("config/engine.toml");
            let json_p = PathBuf::from("config/engine.json");
            if toml_p.exists() {
                Self::load_from(&toml_p)?
            } else if json_p.exists() {
                Self::load_from(&json_p)?
            } else {
                Self::default()
            }
        };
        Ok(base.with_env_overrides()?.sanitized())
    }

    fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_parsed::<usize>(ENV_WINDOW_SIZE)? {
            self.window_size = v;
        }
        if let Ok(v) = std::env::var(ENV_QUALITY_FILTER) {
            self.quality_filter = parse_flag(&v)
                .ok_or_else(|| anyhow!("{ENV_QUALITY_FILTER} must be a boolean, got `{v}`"))?;
        }
        if let Some(v) = env_parsed::<u32>(ENV_FETCH_MAX_ATTEMPTS)? {
            self.fetch.max_attempts = v;
        }
        if let Some(v) = env_parsed::<u64>(ENV_FETCH_RETRY_DELAY)? {
            self.fetch.retry_delay_secs = v;
        }
        Ok(self)
    }

    /// Window and attempts at least 1; backoff factor finite and positive.
    pub fn sanitized(mut self) -> Self {
        self.window_size = self.window_size.max(1);
        self.fetch.max_attempts = self.fetch.max_attempts.max(1);
        if !(self.fetch.backoff_factor.is_finite() && self.fetch.backoff_factor > 0.0) {
            self.fetch.backoff_factor = 1.0;
        }
        self
    }
}

fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(e) => bail!("invalid {key}=`{raw}`: {e}"),
        },
        Err(_) => Ok(None),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: EngineConfig = toml::from_str(
            r#"
window_size = 3
policy = "direct_lexicon"

[fetch]
retry_delay_secs = 1
"#,
        )
        .unwrap();
        assert_eq!(cfg.window_size, 3);
        assert_eq!(cfg.policy, ScoringPolicy::DirectLexicon);
        assert_eq!(cfg.fetch.max_attempts, 3);
        assert_eq!(cfg.fetch.retry_delay_secs, 1);
        assert_eq!(cfg.provider, ProviderConfig::default());
    }

    #[test]
    fn sanitize_clamps_degenerate_values() {
        let mut cfg = EngineConfig::default();
        cfg.window_size = 0;
        cfg.fetch.max_attempts = 0;
        cfg.fetch.backoff_factor = -2.0;
        let cfg = cfg.sanitized();
        assert_eq!(cfg.window_size, 1);
        assert_eq!(cfg.fetch.max_attempts, 1);
        assert_eq!(cfg.fetch.backoff_factor, 1.0);
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
