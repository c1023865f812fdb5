//! URL helpers for Sumi-Harvest
//!
//! Seed URL validation, robots.txt endpoint derivation and href resolution.

use ::url::Url;

/// Parses a seed URL, accepting only absolute HTTP(S) URLs with a host
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::parse_seed_url;
///
/// assert!(parse_seed_url("https://books.toscrape.com/").is_ok());
/// assert!(parse_seed_url("ftp://example.com/").is_err());
/// ```
pub fn parse_seed_url(url_str: &str) -> Result<Url, String> {
    let url = Url::parse(url_str.trim()).map_err(|e| format!("'{}': {}", url_str, e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!(
            "'{}': only http and https schemes are supported, got {}",
            url_str,
            url.scheme()
        ));
    }

    if url.host_str().is_none() {
        return Err(format!("'{}': missing host", url_str));
    }

    Ok(url)
}

/// Derives the robots.txt endpoint (`scheme://host[:port]/robots.txt`) for a URL's origin
///
/// # Examples
///
/// ```
/// use sumi_harvest::url::robots_url;
/// use url::Url;
///
/// let page = Url::parse("https://example.com:8443/a/b?c=d#e").unwrap();
/// assert_eq!(robots_url(&page).as_str(), "https://example.com:8443/robots.txt");
/// ```
pub fn robots_url(url: &Url) -> Url {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    robots
}

/// Resolves an href against a base URL
///
/// Returns `None` for empty hrefs or hrefs the URL parser rejects.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

/// Resolves an href to an absolute string, keeping the raw href when it cannot be joined
pub fn resolve_href_lossy(base: Option<&Url>, href: &str) -> String {
    match base {
        Some(base) => base
            .join(href.trim())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| href.to_string()),
        None => href.to_string(),
    }
}
