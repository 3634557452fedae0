//! Extraction of news items from a listing page.
//!
//! Given the raw HTML of a source and its [`SourceDescriptor`], the first
//! few elements matching the descriptor's selector are taken in document
//! order. Each candidate is searched for:
//!
//! | Field | Lookup (first match wins) | When absent |
//! |-------|---------------------------|-------------|
//! | title | `h2, h3, h4, a, .title` | candidate skipped |
//! | link | first `a`, its `href` | candidate skipped |
//! | description | `p, .description, .excerpt` | placeholder (JSON) / `NULL` (database) |
//!
//! Relative links are resolved against the descriptor URL, then every field
//! is hard-truncated to its column length.

use crate::models::{ItemOutcome, NewsItem, SkipReason, SourceDescriptor};
use crate::utils::{element_text, resolve_link, truncate_chars};
use chrono::Local;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, instrument};

pub const TITLE_MAX_CHARS: usize = 500;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const LINK_MAX_CHARS: usize = 512;

/// Description written to the JSON file when a candidate has none.
pub const NO_DESCRIPTION: &str = "Nessuna descrizione disponibile";

/// Default number of candidates taken per source.
pub const DEFAULT_MAX_PER_SOURCE: usize = 3;

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4, a, .title").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());
static DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, .description, .excerpt").unwrap());
static DATE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("time, .date, .published").unwrap());

/// Which sink the items are extracted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Missing descriptions become [`NO_DESCRIPTION`].
    Json,
    /// Missing descriptions stay `None`; a date element is looked up but not used.
    Database,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
}

/// Extract up to `limit` candidates from `html`.
///
/// Returns one [`ItemOutcome`] per candidate, in document order. Failures of
/// a single candidate are reported in its outcome and never affect the others.
///
/// # Errors
///
/// Returns [`ExtractError::Selector`] if the descriptor's selector does not
/// parse; the whole source then yields nothing.
#[instrument(level = "debug", skip(html, source), fields(entity = %source.entity))]
pub fn extract_items(
    html: &str,
    source: &SourceDescriptor,
    limit: usize,
    mode: ExtractMode,
) -> Result<Vec<ItemOutcome>, ExtractError> {
    let selector = Selector::parse(&source.selector).map_err(|e| ExtractError::Selector {
        selector: source.selector.clone(),
        reason: e.to_string(),
    })?;
    let document = Html::parse_document(html);

    let outcomes = document
        .select(&selector)
        .take(limit)
        .map(|candidate| extract_candidate(&candidate, source, mode))
        .collect::<Vec<_>>();
    debug!(candidates = outcomes.len(), "Extracted candidates");
    Ok(outcomes)
}

fn extract_candidate(candidate: &ElementRef<'_>, source: &SourceDescriptor, mode: ExtractMode) -> ItemOutcome {
    let title = candidate
        .select(&TITLE_SELECTOR)
        .next()
        .and_then(|e| element_text(&e));
    let Some(title) = title else {
        return ItemOutcome::Skipped(SkipReason::MissingTitle);
    };

    let href = candidate
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|a| a.value().attr("href"))
        .unwrap_or("");
    let link = match resolve_link(&source.url, href) {
        Ok(link) => link,
        Err(e) => return ItemOutcome::Failed(format!("cannot resolve link {href:?}: {e}")),
    };

    let description = candidate
        .select(&DESCRIPTION_SELECTOR)
        .next()
        .and_then(|e| element_text(&e));

    if mode == ExtractMode::Database {
        // The date element is looked up but never parsed; items are always
        // stamped with the extraction time.
        let raw_date = candidate
            .select(&DATE_SELECTOR)
            .next()
            .and_then(|e| element_text(&e));
        debug!(?raw_date, "Date element probe");
    }

    let Some(link) = link else {
        return ItemOutcome::Skipped(SkipReason::MissingLink);
    };

    let description = match (description, mode) {
        (Some(d), _) => Some(truncate_chars(&d, DESCRIPTION_MAX_CHARS)),
        (None, ExtractMode::Json) => Some(NO_DESCRIPTION.to_string()),
        (None, ExtractMode::Database) => None,
    };

    ItemOutcome::Extracted(NewsItem {
        title: truncate_chars(&title, TITLE_MAX_CHARS),
        description,
        link: truncate_chars(&link, LINK_MAX_CHARS),
        published_at: Local::now(),
        category: source.category.clone(),
        entity: source.entity.clone(),
        source_url: source.url.clone(),
    })
}
