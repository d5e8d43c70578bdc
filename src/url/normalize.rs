use crate::url::CanonicalUrl;
use crate::UrlError;
use url::Url;

/// Normalizes a URL into its canonical form
///
/// # Normalization Steps
///
/// 1. Resolve against `base` when one is given, otherwise parse as absolute
/// 2. Lowercase scheme and host (done by the parser), drop default ports
/// 3. Remove fragment (everything after #)
/// 4. Normalize path:
///    - Percent-decode, then let the parser re-encode what must be encoded
///    - Collapse runs of `/` into one
///    - Remove trailing slash (except for root /)
/// 5. Sort query parameters by key, keeping every value of repeated keys in
///    their original order, and re-encode them form-urlencoded
/// 6. Remove empty query string (trailing ?)
///
/// URLs that cannot serve as a base (`mailto:`, `data:`) have no
/// hierarchical path and only lose their fragment.
///
/// The result is idempotent: normalizing a canonical URL returns it unchanged.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
/// * `base` - Optional base URL for resolving relative references
///
/// # Returns
///
/// * `Ok(CanonicalUrl)` - Normalized URL
/// * `Err(UrlError)` - The URL (or base) could not be parsed
///
/// # Examples
///
/// ```
/// use doc_harvester::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.com/a//b/?z=1&y=2#frag", None).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a/b?y=2&z=1");
///
/// let url = normalize_url("../c/", Some("https://example.com/a/b/")).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/a/c");
/// ```
pub fn normalize_url(url_str: &str, base: Option<&str>) -> Result<CanonicalUrl, UrlError> {
    let mut url = match base {
        Some(base) => {
            let base = Url::parse(base).map_err(|e| UrlError::Parse(e.to_string()))?;
            base.join(url_str.trim())
                .map_err(|e| UrlError::Parse(e.to_string()))?
        }
        None => Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?,
    };

    url.set_fragment(None);

    if url.cannot_be_a_base() {
        return Ok(CanonicalUrl(url.into()));
    }

    normalize_path(&mut url);
    sort_query(&mut url);

    Ok(CanonicalUrl(url.into()))
}

/// Rewrites the path of `url` into its decoded, collapsed form
fn normalize_path(url: &mut Url) {
    let rewritten = match urlencoding::decode(url.path()) {
        // `%` and `\` survive decoding literally; escape them so the parser
        // cannot read them back as an escape or a separator. The parser
        // silently drops tab, LF and CR, so those are escaped too.
        Ok(decoded) => tidy_path(&decoded)
            .replace('%', "%25")
            .replace('\\', "%5C")
            .replace('\t', "%09")
            .replace('\n', "%0A")
            .replace('\r', "%0D"),
        // Not UTF-8 once decoded; leave the escapes as they are
        Err(_) => tidy_path(url.path()),
    };
    url.set_path(&rewritten);

    // Dot segments resolved by the parser can leave a trailing slash behind
    let settled = tidy_path(url.path());
    if settled != url.path() {
        url.set_path(&settled);
    }
}

/// Collapses repeated slashes and removes a trailing slash (root exempt)
fn tidy_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;

    for c in path.chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(c);
    }

    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }

    if out.is_empty() {
        out.push('/');
    }

    out
}

/// Sorts query parameters by key and drops an empty query
fn sort_query(url: &mut Url) {
    if url.query().is_none() {
        return;
    }

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    // Stable: repeated keys keep their relative order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    url.set_query(None);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params.iter());
    }
}
