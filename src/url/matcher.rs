/// Checks if a domain matches a site pattern
///
/// Two kinds of pattern are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" itself and any
///    subdomain at any depth
///
/// The candidate may carry a `:port` suffix, as produced by
/// [`extract_domain`](crate::url::extract_domain); the port is ignored.
/// Comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use doc_harvester::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(matches_wildcard("*.wikipedia.org", "ru.wikipedia.org"));
/// assert!(matches_wildcard("*.wikipedia.org", "wikipedia.org:8443"));
/// assert!(!matches_wildcard("*.wikipedia.org", "wikimedia.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = strip_port(candidate).to_ascii_lowercase();

    match pattern.strip_prefix("*.") {
        Some(base) => host == base || host.ends_with(&format!(".{}", base)),
        None => host == pattern,
    }
}

/// Drops a trailing `:port` from a host, leaving bracketed IPv6 intact
fn strip_port(candidate: &str) -> &str {
    match candidate.rsplit_once(':') {
        Some((host, port))
            if !port.is_empty()
                && port.chars().all(|c| c.is_ascii_digit())
                && (!host.contains(':') || host.ends_with(']')) =>
        {
            host
        }
        _ => candidate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("example.com", "example.com"));
        assert!(!matches_wildcard("example.com", "blog.example.com"));
        assert!(!matches_wildcard("blog.example.com", "example.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "blog.example.com"));
        assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
    }

    #[test]
    fn test_wildcard_no_partial_match() {
        assert!(!matches_wildcard("*.example.com", "myexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.org"));
        assert!(!matches_wildcard("*.example.com", ""));
    }

    #[test]
    fn test_port_is_ignored() {
        assert!(matches_wildcard("example.com", "example.com:8080"));
        assert!(matches_wildcard("127.0.0.1", "127.0.0.1:45123"));
        assert!(matches_wildcard("*.example.com", "a.example.com:81"));
    }

    #[test]
    fn test_case_insensitive() {
        assert!(matches_wildcard("Example.com", "EXAMPLE.COM"));
        assert!(matches_wildcard("*.WIKIPEDIA.org", "ru.wikipedia.org"));
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
    }
}
