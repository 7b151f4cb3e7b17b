//! Corpus file loading.
//!
//! The corpus is a JSON object whose values are lists of news records:
//!
//! ```json
//! { "AAPL": [ { "ticker": "AAPL", "link": "https://…", "full_text": "…" } ] }
//! ```
//!
//! Only `full_text` is required. Groups and records are both visited in file
//! order, which fixes the index insertion order and so the order of equally
//! scored search results.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::NewsItem;

#[derive(Debug, Deserialize)]
struct NewsRecord {
    full_text: String,
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

/// Read and parse the corpus file at `path`.
pub fn load_corpus(path: &Path) -> Result<Vec<NewsItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;
    parse_corpus(&content).with_context(|| format!("Invalid corpus file: {}", path.display()))
}

/// Parse corpus JSON text into news items.
pub fn parse_corpus(content: &str) -> Result<Vec<NewsItem>> {
    let groups: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(content).context("corpus must be a JSON object")?;

    let mut items = Vec::new();
    for (group, value) in groups {
        let records = value
            .as_array()
            .ok_or_else(|| anyhow!("value of '{}' must be a list of records", group))?;

        for (position, record) in records.iter().enumerate() {
            let record: NewsRecord = serde_json::from_value(record.clone())
                .with_context(|| format!("record {} under '{}'", position, group))?;
            items.push(NewsItem {
                id: format!("{}/{}", group, position),
                group: group.clone(),
                full_text: record.full_text,
                ticker: record.ticker,
                link: record.link,
            });
        }
    }

    Ok(items)
}
