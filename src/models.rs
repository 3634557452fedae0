//! Data models for news sources and the items scraped from them.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SourceDescriptor`]: A site to scrape (category, entity, URL, CSS selector)
//! - [`NewsItem`]: A normalized news record extracted from one matched element
//! - [`ItemOutcome`] / [`SourceOutcome`]: Explicit per-candidate and per-source results
//!
//! `NewsItem` serializes with the snake_case keys of the public `news.json`
//! document consumed by the web client.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single site to scrape.
///
/// Descriptors are static configuration: they are defined once at process
/// start (either the built-in registry or a YAML file) and never mutated.
///
/// # Fields
///
/// * `category` - Grouping shown by the client (e.g. "Istituzioni")
/// * `entity` - Unique display name of the publisher
/// * `url` - Absolute URL of the news listing page; also the base for relative links
/// * `selector` - CSS selector matching one news entry on that page
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceDescriptor {
    pub category: String,
    pub entity: String,
    pub url: String,
    pub selector: String,
}

impl SourceDescriptor {
    pub fn new(category: &str, entity: &str, url: &str, selector: &str) -> Self {
        Self {
            category: category.to_string(),
            entity: entity.to_string(),
            url: url.to_string(),
            selector: selector.to_string(),
        }
    }
}

/// A normalized news record.
///
/// One `NewsItem` is produced per matched HTML element whose title and link
/// could both be resolved. Field lengths are already truncated when the
/// item is built, and `link` is always absolute.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsItem {
    /// Headline text, at most 500 characters.
    pub title: String,
    /// Summary text, at most 1000 characters. The JSON output always carries
    /// a value (a placeholder when none was found); the database stores `NULL`.
    pub description: Option<String>,
    /// Absolute article URL, at most 512 characters.
    pub link: String,
    /// Extraction wall-clock time. No publish date is parsed from the page.
    pub published_at: DateTime<Local>,
    /// Copied from the descriptor.
    pub category: String,
    /// Copied from the descriptor.
    pub entity: String,
    /// The listing page the item was scraped from.
    pub source_url: String,
}

/// Why a candidate element produced no item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    MissingLink,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTitle => write!(f, "no title element"),
            SkipReason::MissingLink => write!(f, "no usable link"),
        }
    }
}

/// Result of extracting one candidate element.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Title and link resolved; the item is kept.
    Extracted(NewsItem),
    /// A required field was absent; the candidate is silently dropped.
    Skipped(SkipReason),
    /// Extraction raised an error; the candidate is dropped and the error logged.
    Failed(String),
}

/// Result of scraping one source end to end.
#[derive(Debug)]
pub enum SourceOutcome {
    /// The page was fetched and parsed. `items` may still be empty.
    Scraped {
        entity: String,
        items: Vec<NewsItem>,
        skipped: usize,
        failed: usize,
    },
    /// Fetching or parsing failed; the source contributes nothing.
    Failed { entity: String, error: String },
}

impl SourceOutcome {
    pub fn entity(&self) -> &str {
        match self {
            SourceOutcome::Scraped { entity, .. } | SourceOutcome::Failed { entity, .. } => entity,
        }
    }
}
