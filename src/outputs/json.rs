//! JSON output for the web client.
//!
//! The whole run is written as one JSON array to a single file (by default
//! `public/news.json`), replacing the previous contents.
//!
//! # Output Structure
//!
//! ```text
//! [
//!   {
//!     "title": "...",
//!     "description": "...",
//!     "link": "https://...",
//!     "published_at": "2025-05-06T09:30:00.123456+02:00",
//!     "category": "Istituzioni",
//!     "entity": "SIMEST",
//!     "source_url": "https://..."
//!   }
//! ]
//! ```

use crate::models::NewsItem;
use crate::utils::ensure_parent_dir;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Default location of the JSON document.
pub const DEFAULT_OUTPUT_PATH: &str = "public/news.json";

/// Write `items` to `path` as a pretty-printed JSON array, newest first.
///
/// Items are stably sorted by `published_at` descending before writing.
/// Non-ASCII text is written as-is in UTF-8.
///
/// # Returns
///
/// The number of items saved. Any failure (serialization, directory
/// creation, write) is logged and reported as `0`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = items.len()))]
pub async fn write_news_json(mut items: Vec<NewsItem>, path: &Path) -> usize {
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));

    match write_json(&items, path).await {
        Ok(()) => {
            info!(count = items.len(), "Saved news items");
            items.len()
        }
        Err(e) => {
            error!(error = %e, "Error saving news to JSON");
            0
        }
    }
}

async fn write_json(items: &[NewsItem], path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(items)?;
    ensure_parent_dir(path).await?;
    fs::write(path, json).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};

    fn item(title: &str, minutes_ago: i64) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            description: Some("Nessuna descrizione disponibile".to_string()),
            link: format!("https://www.fondoforte.it/news/{}", title.to_lowercase()),
            published_at: Local::now() - Duration::minutes(minutes_ago),
            category: "Fondi Interprofessionali".to_string(),
            entity: "For.Te.".to_string(),
            source_url: "https://www.fondoforte.it/news/".to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_run_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("public").join("news.json");

        let saved = write_news_json(vec![], &path).await;

        assert_eq!(saved, 0);
        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_items_sorted_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.json");

        let saved = write_news_json(vec![item("Vecchia", 30), item("Nuova", 1)], &path).await;

        assert_eq!(saved, 2);
        let parsed: Vec<NewsItem> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed[0].title, "Nuova");
        assert_eq!(parsed[1].title, "Vecchia");
    }

    #[tokio::test]
    async fn test_non_ascii_written_unescaped_and_indented() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.json");

        write_news_json(vec![item("Opportunità", 0)], &path).await;

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Opportunità"));
        assert!(!raw.contains("\\u00e0"));
        assert!(raw.contains("\n  {"));
    }

    #[tokio::test]
    async fn test_write_failure_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be overwritten as a file.
        let saved = write_news_json(vec![item("A", 0)], dir.path()).await;
        assert_eq!(saved, 0);
    }
}
