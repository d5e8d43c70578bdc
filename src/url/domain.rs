use url::Url;

/// Extracts the domain from a URL
///
/// The domain is the lowercase host, followed by `:port` when the URL names
/// a port other than the scheme's default. Two servers on the same host but
/// different ports are treated as different sites.
///
/// # Arguments
///
/// * `url` - The URL to extract the domain from
///
/// # Returns
///
/// * `Some(String)` - The lowercase domain
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use doc_harvester::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns the domain of a URL string, or an empty string if it has none
///
/// ```
/// use doc_harvester::url::get_domain;
///
/// assert_eq!(get_domain("https://Sub.Example.com/a"), "sub.example.com");
/// assert_eq!(get_domain("garbage"), "");
/// ```
pub fn get_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| extract_domain(&u))
        .unwrap_or_default()
}

/// Checks whether a URL parses and has both a scheme and a host
pub fn is_valid(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => !parsed.scheme().is_empty() && extract_domain(&parsed).is_some(),
        Err(_) => false,
    }
}

/// Checks whether two URLs belong to the same domain
pub fn is_same_domain(a: &str, b: &str) -> bool {
    let domain = get_domain(a);
    !domain.is_empty() && domain == get_domain(b)
}
