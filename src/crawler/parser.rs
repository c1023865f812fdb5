//! Record extraction from page markup
//!
//! Two modes are supported:
//! - **Selector mode**: a user-supplied CSS selector picks the elements.
//!   When any match is a `<table>`, every table in the document is parsed
//!   instead; otherwise each non-empty match becomes a `{text}` record.
//! - **Auto mode**: tables win when the page has any; otherwise headings,
//!   paragraphs and links are collected, in that order.
//!
//! Extraction never fails on malformed markup; it only yields fewer records.

use crate::crawler::tables::table_records;
use crate::output::Record;
use crate::url::resolve_href_lossy;
use crate::HarvestError;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text is never visible content
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Parses a CSS selector, reporting the offending text on failure
pub fn parse_selector(selector: &str) -> Result<Selector, HarvestError> {
    Selector::parse(selector).map_err(|e| HarvestError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// Extracts records from the elements matched by `selector`
///
/// # Returns
///
/// An empty vector when nothing matches. The caller decides whether to fall
/// back to [`auto_extract`].
pub fn extract_by_selector(markup: &str, selector: &Selector) -> Vec<Record> {
    let document = Html::parse_document(markup);
    let matches: Vec<ElementRef> = document.select(selector).collect();

    if matches.is_empty() {
        return Vec::new();
    }

    if matches.iter().any(|el| el.value().name() == "table") {
        return table_records(&document).unwrap_or_default();
    }

    matches
        .into_iter()
        .filter_map(|el| {
            let text = element_text(el);
            (!text.is_empty()).then(|| Record::new().with("text", text))
        })
        .collect()
}

/// Extracts records without a selector
///
/// Relative link targets are resolved against `base_url` when given; an
/// unresolvable href is kept as written.
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::auto_extract;
///
/// let records = auto_extract("<h2>Title</h2><p>Body</p>", None);
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].get("type"), Some("h2"));
/// assert_eq!(records[1].get("content"), Some("Body"));
/// ```
pub fn auto_extract(markup: &str, base_url: Option<&Url>) -> Vec<Record> {
    let document = Html::parse_document(markup);

    if let Some(records) = table_records(&document) {
        return records;
    }

    let mut records = Vec::new();

    if let Ok(headings) = Selector::parse("h1, h2, h3") {
        for heading in document.select(&headings) {
            let text = element_text(heading);
            if !text.is_empty() {
                records.push(
                    Record::new()
                        .with("type", heading.value().name())
                        .with("content", text),
                );
            }
        }
    }

    if let Ok(paragraphs) = Selector::parse("p") {
        for paragraph in document.select(&paragraphs) {
            let text = element_text(paragraph);
            if !text.is_empty() {
                records.push(Record::new().with("type", "p").with("content", text));
            }
        }
    }

    // Links are kept even without text; the href is the content
    if let Ok(links) = Selector::parse("a[href]") {
        for link in document.select(&links) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            records.push(
                Record::new()
                    .with("type", "a")
                    .with("text", element_text(link))
                    .with("href", resolve_href_lossy(base_url, href)),
            );
        }
    }

    records
}

/// Whitespace-normalized text of an element, ignoring script and style
pub(crate) fn element_text(element: ElementRef) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            if !is_hidden(node.ancestors().filter_map(ElementRef::wrap)) {
                words.extend(text.split_whitespace());
            }
        }
    }
    words.join(" ")
}

/// Whitespace-normalized visible text of a whole document
pub(crate) fn document_text(document: &Html) -> String {
    element_text(document.root_element())
}

fn is_hidden<'a>(mut ancestors: impl Iterator<Item = ElementRef<'a>>) -> bool {
    ancestors.any(|el| HIDDEN_TAGS.contains(&el.value().name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selector() {
        assert!(parse_selector("div.quote span.text").is_ok());
        assert!(matches!(
            parse_selector("div[").unwrap_err(),
            HarvestError::InvalidSelector { .. }
        ));
    }

    #[test]
    fn test_selector_text_records() {
        let html = r#"
            <div class="quote"><span class="text">  First
               quote </span></div>
            <div class="quote"><span class="text">Second</span></div>
            <div class="quote"><span class="text">   </span></div>
        "#;
        let selector = parse_selector("span.text").unwrap();
        let records = extract_by_selector(html, &selector);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("text"), Some("First quote"));
        assert_eq!(records[1].get("text"), Some("Second"));
        assert_eq!(records[0].keys().collect::<Vec<_>>(), vec!["text"]);
    }

    #[test]
    fn test_selector_no_match() {
        let selector = parse_selector("div.missing").unwrap();
        assert!(extract_by_selector("<p>Hello</p>", &selector).is_empty());
    }

    #[test]
    fn test_selector_matching_table_parses_tables() {
        let selector = parse_selector("table").unwrap();
        let records = extract_by_selector("<table><tr><td>A</td></tr></table>", &selector);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].len(), 1);
        assert_eq!(records[0].get("0"), Some("A"));
    }

    #[test]
    fn test_selector_matching_table_parses_every_table() {
        let html = r#"
            <table id="a"><tr><th>Name</th></tr><tr><td>x</td></tr></table>
            <table id="b"><tr><th>Name</th></tr><tr><td>y</td></tr></table>
        "#;
        let selector = parse_selector("table#a").unwrap();
        let records = extract_by_selector(html, &selector);

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("Name"), Some("y"));
    }

    #[test]
    fn test_auto_extract_order() {
        let html = r#"
            <p>Intro</p>
            <h2>Sub</h2>
            <a href="/next">More</a>
            <h1>Main</h1>
        "#;
        let base = Url::parse("http://x/list").unwrap();
        let records = auto_extract(html, Some(&base));

        let types: Vec<_> = records.iter().map(|r| r.get("type").unwrap()).collect();
        assert_eq!(types, vec!["h2", "h1", "p", "a"]);
        assert_eq!(records[3].get("href"), Some("http://x/next"));
        assert_eq!(records[3].get("text"), Some("More"));
    }

    #[test]
    fn test_auto_extract_headings_and_paragraphs_carry_content() {
        let records = auto_extract(r#"<h1>Title</h1><p>Body</p><a href="/x">Go</a>"#, None);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("content"), Some("Title"));
        assert_eq!(records[0].get("text"), None);
        assert_eq!(records[1].get("content"), Some("Body"));
        assert_eq!(records[2].get("content"), None);
        assert_eq!(records[2].get("text"), Some("Go"));
        assert_eq!(records[2].get("href"), Some("/x"));
    }

    #[test]
    fn test_auto_extract_keeps_empty_links() {
        let records = auto_extract(r#"<a href="/img"><img src="x.png"></a>"#, None);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("text"), Some(""));
        assert_eq!(records[0].get("href"), Some("/img"));
    }

    #[test]
    fn test_auto_extract_skips_empty_headings_and_anchors_without_href() {
        let records = auto_extract("<h1>  </h1><p></p><a name=\"top\">Top</a>", None);
        assert!(records.is_empty());
    }

    #[test]
    fn test_auto_extract_prefers_tables() {
        let html = r#"
            <h1>Prices</h1>
            <table>
              <thead><tr><th>Item</th><th>Price</th></tr></thead>
              <tbody><tr><td>Tea</td><td>3</td></tr></tbody>
            </table>
        "#;
        let records = auto_extract(html, None);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("Item"), Some("Tea"));
        assert_eq!(records[0].get("type"), None);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = r#"<h1>A</h1><p>B</p><a href="c">C</a>"#;
        let base = Url::parse("http://x/").unwrap();

        assert_eq!(auto_extract(html, Some(&base)), auto_extract(html, Some(&base)));

        let selector = parse_selector("p").unwrap();
        assert_eq!(
            extract_by_selector(html, &selector),
            extract_by_selector(html, &selector)
        );
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let records = auto_extract("<h1>Unclosed <p>para <a href=", None);
        assert!(!records.is_empty());
    }

    #[test]
    fn test_element_text_skips_scripts() {
        let document = Html::parse_document(
            "<p>Hello <script>var x = 1;</script><b>world</b><style>p{}</style></p>",
        );
        assert_eq!(document_text(&document), "Hello world");
    }
}
