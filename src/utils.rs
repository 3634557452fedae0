//! Utility functions for string truncation, link resolution and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Character-based truncation for stored fields and log previews
//! - Resolution of relative links against a source's listing URL
//! - Text extraction from parsed HTML elements
//! - Output directory preparation for the JSON sink

use scraper::ElementRef;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Truncate a string to at most `max` characters.
///
/// Counts Unicode scalar values, not bytes, so accented Italian text is never
/// split inside a code point.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_chars("perché", 5), "perch");
/// ```
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// a count of the dropped characters appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        format!("{}…(+{} chars)", truncate_chars(s, max), total - max)
    }
}

/// Resolve an `href` against the listing page it was found on.
///
/// An empty `href` yields `None`. An `href` that already parses as an
/// absolute URL is kept verbatim; anything else is joined onto `base`.
///
/// # Errors
///
/// Returns an error if `base` is not a valid URL or the join fails.
///
/// # Examples
///
/// ```ignore
/// let link = resolve_link("https://example.it/news", "/news/123")?;
/// assert_eq!(link.as_deref(), Some("https://example.it/news/123"));
/// ```
pub fn resolve_link(base: &str, href: &str) -> Result<Option<String>, url::ParseError> {
    let href = href.trim();
    if href.is_empty() {
        return Ok(None);
    }
    if Url::parse(href).is_ok() {
        return Ok(Some(href.to_string()));
    }
    let resolved = Url::parse(base)?.join(href)?;
    Ok(Some(resolved.to_string()))
}

/// Concatenate all text nodes below `element` and trim the result.
///
/// Returns `None` when the element carries no visible text.
pub fn element_text(element: &ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Ensure the parent directory of `path` exists.
///
/// A bare file name (no parent component) needs no directory.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub async fn ensure_parent_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).await?;
            info!(dir = %parent.display(), "Output directory ready");
            Ok(())
        }
        _ => Ok(()),
    }
}
