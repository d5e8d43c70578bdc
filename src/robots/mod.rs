//! Robots.txt handling module
//!
//! This module provides functionality for fetching and parsing robots.txt
//! files and turning them into a per-domain [`RobotsPolicy`].

mod cache;
mod parser;

pub use cache::RobotsPolicy;
pub use parser::{product_token, ParsedRobots};

use crate::url::extract_domain;
use reqwest::Client;
use url::Url;

/// Returns the robots.txt location for the site serving `url`
pub fn robots_url(url: &Url) -> Option<String> {
    let domain = extract_domain(url)?;
    Some(format!("{}://{}/robots.txt", url.scheme(), domain))
}

/// Fetches robots.txt for the site serving `url`
///
/// Never fails. The outcome is folded into the returned policy:
///
/// | Response | Policy |
/// |----------|--------|
/// | 2xx | parsed rules and crawl delay |
/// | 4xx | no robots.txt, allow all |
/// | 5xx, timeout, transport error | allow all, `fetch_failed` set |
pub async fn fetch_robots(client: &Client, url: &Url, user_agent: &str) -> RobotsPolicy {
    let Some(robots_url) = robots_url(url) else {
        return RobotsPolicy::unreachable();
    };

    tracing::debug!("Fetching {}", robots_url);

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Could not fetch {}: {}; allowing all", robots_url, e);
            return RobotsPolicy::unreachable();
        }
    };

    let status = response.status();
    if status.is_client_error() {
        tracing::debug!("{} returned {}; treating as absent", robots_url, status);
        return RobotsPolicy::allow_all();
    }
    if !status.is_success() {
        tracing::warn!("{} returned {}; allowing all", robots_url, status);
        return RobotsPolicy::unreachable();
    }

    match response.text().await {
        Ok(body) => RobotsPolicy::from_content(&body, user_agent),
        Err(e) => {
            tracing::warn!("Could not read {}: {}; allowing all", robots_url, e);
            RobotsPolicy::unreachable()
        }
    }
}
