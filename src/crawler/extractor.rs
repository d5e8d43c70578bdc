//! Link extraction from HTML documents
//!
//! Only `<a href>` links are followed. Links are resolved against the page's
//! final URL and returned absolute; normalization and domain filtering happen
//! in the orchestrator.

use scraper::{Html, Selector};
use url::Url;

/// File extensions that never lead to an HTML document
const SKIPPED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".pdf", ".doc", ".docx", ".xls",
    ".xlsx", ".ppt", ".pptx", ".zip", ".rar", ".7z", ".tar", ".gz", ".mp3", ".mp4", ".avi",
    ".mov", ".wmv", ".flv", ".css", ".js", ".json", ".xml", ".ttf", ".woff", ".woff2", ".eot",
];

/// Pulls followable links out of a fetched page
pub trait LinkExtractor: Send + Sync {
    /// Returns absolute http(s) links found in `html`
    ///
    /// # Arguments
    ///
    /// * `html` - The decoded page
    /// * `base_url` - The URL the page was served from, used for relative links
    fn extract(&self, html: &str, base_url: &str) -> Result<Vec<String>, String>;
}

/// [`LinkExtractor`] backed by `scraper`
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlLinkExtractor;

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    /// # Link Extraction Rules
    ///
    /// **Include:**
    /// - `<a href="...">` anywhere in the document
    ///
    /// **Exclude:**
    /// - `<a href="..." download>`
    /// - `javascript:`, `mailto:`, `tel:` links and data URIs
    /// - Fragment-only links
    /// - Non-HTTP(S) URLs after resolution
    /// - URLs whose path ends in a known non-document extension
    fn extract(&self, html: &str, base_url: &str) -> Result<Vec<String>, String> {
        let base = Url::parse(base_url).map_err(|e| format!("invalid base URL {}: {}", base_url, e))?;
        let selector = Selector::parse("a[href]").map_err(|e| e.to_string())?;
        let document = Html::parse_document(html);

        let links = document
            .select(&selector)
            .filter(|element| element.value().attr("download").is_none())
            .filter_map(|element| element.value().attr("href"))
            .filter_map(|href| resolve_link(href, &base))
            .collect();

        Ok(links)
    }
}

/// Resolves a link href to an absolute URL and validates it
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    if has_skipped_extension(&absolute) {
        return None;
    }

    Some(absolute.to_string())
}

/// True when the URL path ends in a non-document file extension
fn has_skipped_extension(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}
