//! Offline trend report: score a JSON batch of items and print the result.
//!
//! Usage:
//!   trend_report <items.json> [--window N] [--policy composite_quality|direct_lexicon]
//!                [--quality-filter] [--quote SYMBOL]

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::PathBuf;

use trend_sentiment_engine::fetch::providers::YahooChartProvider;
use trend_sentiment_engine::types::parse_batch;
use trend_sentiment_engine::{EngineConfig, ResilientFetcher, SentimentEngine, TrendOptions};

struct Args {
    input: PathBuf,
    window: Option<usize>,
    policy: Option<String>,
    quality_filter: bool,
    quote: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut it = std::env::args().skip(1);
    let mut input = None;
    let mut window = None;
    let mut policy = None;
    let mut quality_filter = false;
    let mut quote = None;

    while let Some(a) = it.next() {
        match a.as_str() {
            "--window" => {
                let v = it.next().context("--window needs a value")?;
                window = Some(v.parse().with_context(|| format!("bad --window `{v}`"))?);
            }
            "--policy" => policy = Some(it.next().context("--policy needs a value")?),
            "--quality-filter" => quality_filter = true,
            "--quote" => quote = Some(it.next().context("--quote needs a symbol")?),
            s if s.starts_with("--") => bail!("unknown flag {s}"),
            _ if input.is_none() => input = Some(PathBuf::from(a)),
            _ => bail!("unexpected argument {a}"),
        }
    }

    Ok(Args {
        input: input.context("usage: trend_report <items.json> [--window N] [--policy P] [--quality-filter] [--quote SYMBOL]")?,
        window,
        policy,
        quality_filter,
        quote,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    trend_sentiment_engine::init_tracing();

    let args = parse_args()?;
    let cfg = EngineConfig::load_default()?;

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let items = parse_batch(&raw)?;

    let mut opts = TrendOptions::from(&cfg);
    if let Some(w) = args.window {
        opts.window_size = w.max(1);
    }
    if let Some(p) = &args.policy {
        opts.policy = p.parse()?;
    }
    opts.quality_filter |= args.quality_filter;

    let engine = SentimentEngine::from_config(&cfg)?;
    let report = engine.analyze(&items, &opts);

    let quote = match &args.quote {
        Some(symbol) => {
            let provider = YahooChartProvider::from_config(&cfg.provider)?;
            let fetcher = ResilientFetcher::new(cfg.fetch.retry_policy());
            Some(fetcher.fetch_series(&provider, symbol).await)
        }
        None => None,
    };

    let out = json!({
        "label": report.trend.label,
        "description": report.trend.label.describe(),
        "current_value": report.trend.current_value,
        "trend": report.trend,
        "summary": report.summary,
        "scored": report.scored,
        "kept": report.kept,
        "quote": quote,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
