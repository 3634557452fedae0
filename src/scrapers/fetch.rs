//! HTTP retrieval of listing pages.
//!
//! The module uses a trait-based design so the aggregation loop can be
//! exercised without network access:
//! - [`FetchHtml`]: Core trait returning the raw HTML of a URL
//! - [`HttpFetcher`]: Production implementation on top of one shared `reqwest::Client`
//!
//! Every request carries a fixed desktop user-agent and is abandoned after a
//! fixed timeout. There is no retry: a failed fetch is final for that source.
//!
//! Bodies are decoded with the charset of the `Content-Type` header, else the
//! one declared by a `<meta>` tag near the top of the page, else UTF-8.

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// User-agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// How far into the body a `<meta>` charset declaration is looked for.
const META_SNIFF_BYTES: usize = 2048;

/// Failure to obtain a listing page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = e.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source: e,
            }
        }
    }
}

/// Trait for retrieving the HTML of a page.
///
/// Implementors return the response body of a successful (2xx) request, or a
/// [`FetchError`] describing why no body is available.
pub trait FetchHtml {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// [`FetchHtml`] backed by a single `reqwest::Client`.
///
/// The client is built once per run and reused for every source.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given user-agent and per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl FetchHtml for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!(bytes = bytes.len(), ?content_type, "Fetched listing page");
        Ok(decode_html(&bytes, content_type.as_deref()))
    }
}

/// Decode an HTML body to text.
///
/// The charset comes from `content_type` when it names a known encoding,
/// otherwise from a `<meta charset>` or `<meta http-equiv="Content-Type">`
/// tag in the first [`META_SNIFF_BYTES`] bytes, otherwise UTF-8.
pub fn decode_html(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| sniff_meta_charset(body))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

/// The value following `charset=` in a header or tag, without quotes.
fn charset_label(s: &str) -> Option<&str> {
    let start = s.to_ascii_lowercase().find("charset=")? + "charset=".len();
    let label = s[start..].trim_start_matches(['"', '\'']);
    let end = label
        .find(|c: char| matches!(c, '"' | '\'' | ';' | '>' | '/') || c.is_whitespace())
        .unwrap_or(label.len());
    let label = &label[..end];
    (!label.is_empty()).then_some(label)
}

fn sniff_meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_BYTES)]);
    // ASCII lowercasing keeps byte offsets aligned with `head`.
    let lower = head.to_ascii_lowercase();

    let mut offset = 0;
    while let Some(pos) = lower[offset..].find("<meta") {
        let tag_start = offset + pos;
        let tag_end = lower[tag_start..]
            .find('>')
            .map_or(lower.len(), |end| tag_start + end);
        if let Some(encoding) = charset_label(&head[tag_start..tag_end])
            .and_then(|label| Encoding::for_label(label.as_bytes()))
        {
            return Some(encoding);
        }
        offset = tag_end;
    }
    None
}
