//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building the HTTP client with the crawler's fixed header set
//! - Asking the politeness engine before every attempt
//! - Retry with linear backoff for transient failures
//! - Charset detection and decoding of the response body

use crate::config::CrawlerConfig;
use crate::politeness::PolitenessEngine;
use crate::url::CanonicalUrl;
use crate::HarvestError;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::time::Duration;

/// Accept header sent with every request
pub const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Accept-Language header sent with every request
pub const ACCEPT_LANGUAGE_VALUE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// Longest Retry-After we are willing to honour
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Bytes scanned for a `<meta charset>` declaration
const META_SNIFF_LEN: usize = 1024;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested
    pub url: CanonicalUrl,
    /// Final URL after redirects
    pub final_url: String,
    pub status: u16,
    /// Raw response body
    pub body: Vec<u8>,
    /// Body decoded to text
    pub html: String,
    /// Name of the encoding used to decode the body
    pub encoding: &'static str,
    /// Number of attempts it took
    pub attempts: u32,
}

/// Why a fetch gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// A status that is not worth retrying (403, 404 and anything unhandled)
    Status(u16),
    /// Every attempt failed with a transient error
    Exhausted { attempts: u32, last_error: String },
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP {}", code),
            Self::Exhausted {
                attempts,
                last_error,
            } => write!(f, "gave up after {} attempts: {}", attempts, last_error),
        }
    }
}

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched(FetchedPage),
    /// Refused by robots.txt or a site override; no request was made
    Disallowed,
    Failed(FetchFailure),
}

/// Builds the header set sent with every request
pub fn request_headers(user_agent: &str) -> Result<HeaderMap, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    Ok(headers)
}

/// Builds an HTTP client with proper configuration
///
/// The client sends [`request_headers`] on every request, negotiates gzip,
/// deflate and brotli, follows up to 10 redirects and applies the configured
/// request timeout.
///
/// # Example
///
/// ```no_run
/// use doc_harvester::config::CrawlerConfig;
/// use doc_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, HarvestError> {
    let timeout = config.timeout();

    let client = Client::builder()
        .default_headers(request_headers(&config.user_agent)?)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()?;

    Ok(client)
}

/// Retryable page fetcher
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    backoff_base: Duration,
}

impl Fetcher {
    pub fn new(client: Client, config: &CrawlerConfig) -> Self {
        Self {
            client,
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff(),
        }
    }

    /// Linear backoff for a zero-based attempt number
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (attempt + 1)
    }

    /// Fetches a URL with full error handling and retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 200 | decode body and return it |
    /// | HTTP 403 / 404 | give up immediately |
    /// | HTTP 429 | retry after `max(backoff, floor, Retry-After)` |
    /// | HTTP 5xx | retry after `max(backoff, floor)` |
    /// | Timeout / connection / other transport error | retry after `max(backoff, floor)` |
    /// | Any other status | give up immediately |
    ///
    /// Politeness is asked before every attempt; a refusal ends the fetch
    /// without consuming an attempt. Every attempt counts as a request to
    /// the domain and first waits out whatever is left of the domain's crawl
    /// delay, which covers a robots.txt request made just before. There is
    /// no wait after the last attempt.
    pub async fn fetch(&self, politeness: &mut PolitenessEngine, url: &CanonicalUrl) -> FetchOutcome {
        let domain = url.domain();
        let floor = politeness.delay_floor();
        let mut last_error = String::new();

        for attempt in 0..self.max_attempts {
            if !politeness.can_fetch(url).await {
                return FetchOutcome::Disallowed;
            }
            if let Some(wait) = politeness.time_until_allowed(&domain) {
                tokio::time::sleep(wait).await;
            }
            politeness.record_request(&domain);

            let base_wait = self.backoff(attempt).max(floor);

            let wait = match self.client.get(url.as_str()).send().await {
                Ok(response) => match response.status() {
                    StatusCode::OK => match read_page(url, response, attempt + 1).await {
                        Ok(page) => return FetchOutcome::Fetched(page),
                        Err(e) => {
                            last_error = format!("failed to read body: {}", e);
                            base_wait
                        }
                    },
                    StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                        return FetchOutcome::Failed(FetchFailure::Status(
                            response.status().as_u16(),
                        ));
                    }
                    StatusCode::TOO_MANY_REQUESTS => {
                        last_error = "HTTP 429".to_string();
                        let requested = parse_retry_after(response.headers())
                            .map(|d| d.min(MAX_RETRY_AFTER))
                            .unwrap_or_default();
                        base_wait.max(requested)
                    }
                    status if status.is_server_error() => {
                        last_error = format!("HTTP {}", status.as_u16());
                        base_wait
                    }
                    status => {
                        return FetchOutcome::Failed(FetchFailure::Status(status.as_u16()));
                    }
                },
                Err(e) => {
                    last_error = if e.is_timeout() {
                        "request timeout".to_string()
                    } else if e.is_connect() {
                        format!("connection error: {}", e)
                    } else {
                        e.to_string()
                    };
                    base_wait
                }
            };

            if attempt + 1 < self.max_attempts {
                tracing::debug!(
                    "Attempt {}/{} for {} failed ({}); retrying in {:?}",
                    attempt + 1,
                    self.max_attempts,
                    url,
                    last_error,
                    wait
                );
                tokio::time::sleep(wait).await;
            }
        }

        FetchOutcome::Failed(FetchFailure::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

/// Reads and decodes the body of a 200 response
async fn read_page(
    url: &CanonicalUrl,
    response: Response,
    attempts: u32,
) -> Result<FetchedPage, reqwest::Error> {
    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let header_charset = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(charset_from_content_type);

    let body = response.bytes().await?.to_vec();
    let (html, encoding) = decode_body(&body, header_charset.as_deref());

    Ok(FetchedPage {
        url: url.clone(),
        final_url,
        status,
        body,
        html,
        encoding,
        attempts,
    })
}

/// Decodes a body using the given charset label, a `<meta>` declaration or UTF-8
///
/// Returns the text and the name of the encoding that was used. A byte order
/// mark overrides everything else.
pub fn decode_body(body: &[u8], header_charset: Option<&str>) -> (String, &'static str) {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .or_else(|| sniff_meta_charset(body).and_then(|label| Encoding::for_label(label.as_bytes())))
        .unwrap_or(UTF_8);

    let (text, used, _had_errors) = encoding.decode(body);
    (text.into_owned(), used.name())
}

/// Extracts the charset parameter of a Content-Type value
fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Looks for `charset=` in the first bytes of a document
///
/// Covers both `<meta charset="...">` and the `http-equiv` form.
fn sniff_meta_charset(body: &[u8]) -> Option<String> {
    let head = &body[..body.len().min(META_SNIFF_LEN)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let start = head.find("charset=")? + "charset=".len();
    let label: String = head[start..]
        .trim_start_matches(|c| c == '"' || c == '\'')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
        .collect();

    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

/// Parses a Retry-After header given either in seconds or as an HTTP date
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim();

    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let when = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = when.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Some(delta.to_std().unwrap_or_default())
}
