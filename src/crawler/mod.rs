//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and charset decoding
//! - HTML link extraction
//! - The breadth-first frontier
//! - Overall crawl orchestration

mod extractor;
mod fetcher;
mod frontier;
mod orchestrator;

pub use extractor::{HtmlLinkExtractor, LinkExtractor};
pub use fetcher::{
    build_http_client, decode_body, parse_retry_after, request_headers, FetchFailure,
    FetchOutcome, FetchedPage, Fetcher, ACCEPT_LANGUAGE_VALUE, ACCEPT_VALUE,
};
pub use frontier::{Frontier, FrontierItem};
pub use orchestrator::{run_crawl, Orchestrator, PageOutcome};
