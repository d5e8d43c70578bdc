//! Robots.txt parser implementation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate (a port of
//! Google's matcher). Crawl-delay is not part of that matcher, so it is
//! extracted here with a small group-aware scan.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content
    content: String,
    /// Skip matching entirely
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when a site has no robots.txt or it could not be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks if a URL is allowed for the given user agent
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path to check
    /// * `user_agent` - The full User-Agent string; only its product token
    ///   (the part before the first `/`) takes part in group selection
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product_token(user_agent), url)
    }

    /// Gets the crawl delay (in seconds) that applies to a user agent
    ///
    /// A group addressed to the agent's product token wins over the `*`
    /// group. Unparseable, negative or non-finite values are ignored.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.allow_all {
            return None;
        }

        let token = product_token(user_agent).to_lowercase();

        let mut group_agents: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut delay_for_wildcard: Option<f64> = None;
        let mut delay_for_agent: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after rules opens a new group
                    if in_rules {
                        group_agents.clear();
                        in_rules = false;
                    }
                    group_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Some(delay) = value
                        .parse::<f64>()
                        .ok()
                        .filter(|d| d.is_finite() && *d >= 0.0)
                    else {
                        continue;
                    };

                    if !token.is_empty() && group_agents.iter().any(|ua| *ua == token) {
                        delay_for_agent.get_or_insert(delay);
                    } else if group_agents.iter().any(|ua| ua == "*") {
                        delay_for_wildcard.get_or_insert(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        delay_for_agent.or(delay_for_wildcard)
    }
}

/// Returns the product token of a User-Agent string
///
/// `"MAI-Crawler/1.0 (Research Bot)"` yields `"MAI-Crawler"`.
pub fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const UA: &str = "TestBot/1.0 (+https://example.com/bot)";

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("https://example.com/any/path", UA));
        assert!(robots.is_allowed("/admin", UA));
    }

    #[test]
    fn test_parse_disallow_all() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("https://example.com/", UA));
        assert!(!robots.is_allowed("https://example.com/page", UA));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /private/");
        assert!(robots.is_allowed("https://example.com/", UA));
        assert!(robots.is_allowed("https://example.com/public", UA));
        assert!(!robots.is_allowed("https://example.com/private/x", UA));
    }

    #[test]
    fn test_parse_allow_and_disallow() {
        let content = "User-agent: *\nDisallow: /private\nAllow: /private/public";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("https://example.com/private", UA));
        assert!(robots.is_allowed("https://example.com/private/public", UA));
    }

    #[test]
    fn test_specific_group_uses_product_token() {
        let content = "User-agent: TestBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("https://example.com/page", UA));
        assert!(robots.is_allowed("https://example.com/page", "OtherBot/2.0"));
    }

    #[test]
    fn test_empty_and_garbage_robots_allow() {
        assert!(ParsedRobots::from_content("").is_allowed("https://example.com/x", UA));
        assert!(ParsedRobots::from_content("not robots {{{").is_allowed("https://example.com/x", UA));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 10\nDisallow: /admin");
        assert_eq!(robots.crawl_delay(UA), Some(10.0));
        assert_eq!(robots.crawl_delay("AnyBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_after_rules_in_group() {
        let robots = ParsedRobots::from_content("User-agent: *\nDisallow: /admin\nCrawl-delay: 3");
        assert_eq!(robots.crawl_delay(UA), Some(3.0));
    }

    #[test]
    fn test_crawl_delay_specific_agent_wins() {
        let content = "User-agent: *\nCrawl-delay: 10\n\nUser-agent: TestBot\nCrawl-delay: 5";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay(UA), Some(5.0));
        assert_eq!(robots.crawl_delay("OtherBot/1.0"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_new_group_after_rules() {
        let content = "User-agent: *\nDisallow: /a\nUser-agent: OtherBot\nCrawl-delay: 9";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay(UA), None);
        assert_eq!(robots.crawl_delay("OtherBot"), Some(9.0));
    }

    #[test]
    fn test_crawl_delay_multiple_user_agents() {
        let robots = ParsedRobots::from_content("User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3");
        assert_eq!(robots.crawl_delay("BotA"), Some(3.0));
        assert_eq!(robots.crawl_delay("botb/2"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }

    #[test]
    fn test_crawl_delay_invalid_values_ignored() {
        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: soon\nCrawl-delay: -4");
        assert_eq!(robots.crawl_delay(UA), None);

        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 2.5 # seconds");
        assert_eq!(robots.crawl_delay(UA), Some(2.5));
    }

    #[test]
    fn test_product_token() {
        assert_eq!(product_token("MAI-Crawler/1.0 (Bot)"), "MAI-Crawler");
        assert_eq!(product_token("Plain"), "Plain");
        assert_eq!(product_token(""), "");
    }
}
