//! Next-page discovery
//!
//! Looks for an anchor whose text reads like "next" (English or Indonesian
//! variants), then falls back to a `<link rel="next">` element. The result
//! is resolved against the current page URL.

use crate::crawler::parser::element_text;
use crate::url::resolve_href;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

const NEXT_LINK_PATTERN: &str = r"(?i)(next|older|berikutnya|lanjut)";

fn next_link_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(NEXT_LINK_PATTERN).ok()).as_ref()
}

/// Finds the URL of the next page, if the markup advertises one
///
/// # Arguments
///
/// * `markup` - The current page's HTML
/// * `current_url` - URL the markup was fetched from, used for resolution
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::find_next_page;
/// use url::Url;
///
/// let current = Url::parse("http://x/p1").unwrap();
/// let next = find_next_page(r#"<a href="/p2">Next</a>"#, &current);
/// assert_eq!(next.unwrap().as_str(), "http://x/p2");
/// ```
pub fn find_next_page(markup: &str, current_url: &Url) -> Option<Url> {
    let document = Html::parse_document(markup);

    if let (Some(regex), Ok(anchors)) = (next_link_regex(), Selector::parse("a")) {
        for anchor in document.select(&anchors) {
            if !regex.is_match(&element_text(anchor)) {
                continue;
            }
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if let Some(url) = resolve_href(current_url, href) {
                return Some(url);
            }
        }
    }

    let links = Selector::parse("link[rel][href]").ok()?;
    document
        .select(&links)
        .filter(|link| {
            link.value()
                .attr("rel")
                .is_some_and(|rel| rel.split_whitespace().any(|t| t.eq_ignore_ascii_case("next")))
        })
        .find_map(|link| resolve_href(current_url, link.value().attr("href")?))
}
