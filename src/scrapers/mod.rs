//! Scraping pipeline: fetch every listing page and extract its newest items.
//!
//! This module contains the two stages run for each source and the loop that
//! ties them together:
//!
//! 1. **Fetching** ([`fetch`]): download the listing page HTML
//! 2. **Extraction** ([`extract`]): turn the first few matched elements into [`NewsItem`]s
//!
//! [`scrape_all`] walks the registry strictly in order, one source at a time.
//! A source that cannot be fetched or parsed is logged and contributes no
//! items; the run always continues with the next source.

pub mod extract;
pub mod fetch;

use crate::models::{ItemOutcome, NewsItem, SourceDescriptor, SourceOutcome};
use crate::utils::truncate_for_log;
use extract::{extract_items, ExtractMode, DEFAULT_MAX_PER_SOURCE};
use fetch::FetchHtml;
use tracing::{debug, error, info, instrument, warn};

/// Per-run scraping settings.
#[derive(Debug, Clone, Copy)]
pub struct ScrapeOptions {
    /// Maximum number of candidates taken from each page.
    pub max_per_source: usize,
    /// Which sink the items are destined for.
    pub mode: ExtractMode,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            max_per_source: DEFAULT_MAX_PER_SOURCE,
            mode: ExtractMode::Json,
        }
    }
}

/// Everything collected by one pass over the registry.
#[derive(Debug, Default)]
pub struct ScrapeReport {
    /// All extracted items, in source order then document order.
    pub items: Vec<NewsItem>,
    pub sources_ok: usize,
    pub sources_failed: usize,
    /// Candidates dropped for a missing title or link.
    pub candidates_skipped: usize,
    /// Candidates dropped because extraction errored.
    pub candidates_failed: usize,
    /// `(entity, error)` for every source that contributed nothing.
    pub failures: Vec<(String, String)>,
}

impl ScrapeReport {
    /// Fold one source's outcome into the report.
    pub fn record(&mut self, outcome: SourceOutcome) {
        match outcome {
            SourceOutcome::Scraped {
                items,
                skipped,
                failed,
                ..
            } => {
                self.sources_ok += 1;
                self.candidates_skipped += skipped;
                self.candidates_failed += failed;
                self.items.extend(items);
            }
            SourceOutcome::Failed { entity, error } => {
                self.sources_failed += 1;
                self.failures.push((entity, error));
            }
        }
    }

    pub fn total_scraped(&self) -> usize {
        self.items.len()
    }
}

/// Fetch and extract a single source.
///
/// Never fails: fetch and selector errors become [`SourceOutcome::Failed`],
/// per-candidate errors are logged and counted.
#[instrument(level = "info", skip_all, fields(entity = %source.entity, url = %source.url))]
pub async fn scrape_source<F: FetchHtml>(
    fetcher: &F,
    source: &SourceDescriptor,
    options: &ScrapeOptions,
) -> SourceOutcome {
    let html = match fetcher.fetch(&source.url).await {
        Ok(html) => html,
        Err(e) => {
            error!(error = %e, "Failed to fetch source");
            return SourceOutcome::Failed {
                entity: source.entity.clone(),
                error: e.to_string(),
            };
        }
    };

    let outcomes = match extract_items(&html, source, options.max_per_source, options.mode) {
        Ok(outcomes) => outcomes,
        Err(e) => {
            error!(error = %e, "Failed to parse source");
            return SourceOutcome::Failed {
                entity: source.entity.clone(),
                error: e.to_string(),
            };
        }
    };

    if outcomes.is_empty() {
        debug!(preview = %truncate_for_log(&html, 200), "Selector matched nothing");
    }

    let mut items = Vec::new();
    let mut skipped = 0;
    let mut failed = 0;
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            ItemOutcome::Extracted(item) => items.push(item),
            ItemOutcome::Skipped(reason) => {
                debug!(index, %reason, "Skipping candidate");
                skipped += 1;
            }
            ItemOutcome::Failed(e) => {
                warn!(index, error = %e, "Error parsing news item");
                failed += 1;
            }
        }
    }

    SourceOutcome::Scraped {
        entity: source.entity.clone(),
        items,
        skipped,
        failed,
    }
}

/// Scrape every source in registry order and collect the results.
#[instrument(level = "info", skip_all, fields(sources = sources.len()))]
pub async fn scrape_all<F: FetchHtml>(
    fetcher: &F,
    sources: &[SourceDescriptor],
    options: &ScrapeOptions,
) -> ScrapeReport {
    let mut report = ScrapeReport::default();

    for source in sources {
        info!(entity = %source.entity, url = %source.url, "Scraping source");
        let outcome = scrape_source(fetcher, source, options).await;
        if let SourceOutcome::Scraped { items, .. } = &outcome {
            info!(entity = %outcome.entity(), count = items.len(), "Found news items");
        }
        report.record(outcome);
    }

    info!(
        total = report.total_scraped(),
        sources_ok = report.sources_ok,
        sources_failed = report.sources_failed,
        skipped = report.candidates_skipped,
        failed = report.candidates_failed,
        "Scraping completed"
    );
    for (entity, error) in &report.failures {
        warn!(%entity, %error, "Source contributed no items");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use fetch::FetchError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned pages; unknown URLs time out. Records the request order.
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, String>,
        requested: RefCell<Vec<String>>,
    }

    impl StubFetcher {
        fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    impl FetchHtml for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requested.borrow_mut().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Timeout {
                url: url.to_string(),
            })
        }
    }

    fn registry() -> Vec<SourceDescriptor> {
        vec![
            SourceDescriptor::new("Fondi Interprofessionali", "Fondimpresa", "https://a.example.it/news", "article"),
            SourceDescriptor::new("Istituzioni", "MIMIT", "https://b.example.it/news", ".news"),
            SourceDescriptor::new("Regioni", "Regione Toscana", "https://c.example.it/news", ".news-item"),
        ]
    }

    const PAGE_A: &str = r#"<article><h2>A1</h2><a href="/1">x</a></article>
        <article><h2>A2</h2><a href="/2">x</a></article>"#;
    const PAGE_C: &str = r#"<div class="news-item"><h3>C1</h3><a href="/c1">x</a></div>
        <div class="news-item"><span>no title</span></div>"#;

    #[tokio::test]
    async fn test_timeout_on_one_source_does_not_stop_the_run() {
        let fetcher = StubFetcher::default()
            .with_page("https://a.example.it/news", PAGE_A)
            .with_page("https://c.example.it/news", PAGE_C);

        let report = scrape_all(&fetcher, &registry(), &ScrapeOptions::default()).await;

        assert_eq!(fetcher.requested.borrow().len(), 3);
        assert_eq!(report.sources_ok, 2);
        assert_eq!(report.sources_failed, 1);
        assert_eq!(report.total_scraped(), 3);
        assert_eq!(report.candidates_skipped, 1);
    }

    #[tokio::test]
    async fn test_items_preserve_source_then_document_order() {
        let fetcher = StubFetcher::default()
            .with_page("https://a.example.it/news", PAGE_A)
            .with_page("https://b.example.it/news", r#"<div class="news"><h2>B1</h2><a href="/b">x</a></div>"#)
            .with_page("https://c.example.it/news", PAGE_C);

        let report = scrape_all(&fetcher, &registry(), &ScrapeOptions::default()).await;

        let titles = report.items.iter().map(|i| i.title.as_str()).collect::<Vec<_>>();
        assert_eq!(titles, vec!["A1", "A2", "B1", "C1"]);
        assert_eq!(
            *fetcher.requested.borrow(),
            vec![
                "https://a.example.it/news".to_string(),
                "https://b.example.it/news".to_string(),
                "https://c.example.it/news".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_bad_selector_fails_only_that_source() {
        let mut sources = registry();
        sources[0].selector = "article[[".to_string();
        let fetcher = StubFetcher::default()
            .with_page("https://a.example.it/news", PAGE_A)
            .with_page("https://c.example.it/news", PAGE_C);

        let outcome = scrape_source(&fetcher, &sources[0], &ScrapeOptions::default()).await;
        assert!(matches!(outcome, SourceOutcome::Failed { ref entity, .. } if entity == "Fondimpresa"));

        let report = scrape_all(&fetcher, &sources, &ScrapeOptions::default()).await;
        assert_eq!(report.sources_failed, 2);
        assert_eq!(report.total_scraped(), 1);
        let failed = report.failures.iter().map(|(e, _)| e.as_str()).collect::<Vec<_>>();
        assert_eq!(failed, vec!["Fondimpresa", "MIMIT"]);
        assert!(report.failures[0].1.contains("invalid selector"));
        assert!(report.failures[1].1.contains("timed out"));
    }

    #[tokio::test]
    async fn test_max_per_source_is_honored() {
        let fetcher = StubFetcher::default().with_page("https://a.example.it/news", PAGE_A);
        let options = ScrapeOptions {
            max_per_source: 1,
            mode: ExtractMode::Json,
        };
        let outcome = scrape_source(&fetcher, &registry()[0], &options).await;
        match outcome {
            SourceOutcome::Scraped { items, .. } => assert_eq!(items.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_all_sources_failing_yields_empty_report() {
        let fetcher = StubFetcher::default();
        let report = scrape_all(&fetcher, &registry(), &ScrapeOptions::default()).await;
        assert!(report.items.is_empty());
        assert_eq!(report.sources_failed, 3);
    }
}
