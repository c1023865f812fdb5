//! Anti-automation challenge detection
//!
//! A page counts as a challenge when it embeds a known captcha widget or its
//! visible text contains a typical "prove you are human" phrase. The check is
//! pure and works on rendered or static markup alike.

use crate::crawler::parser::document_text;
use scraper::{Html, Selector};

/// Markers of embedded captcha widgets
const CHALLENGE_SELECTORS: &str =
    "iframe[src*='recaptcha'], div.g-recaptcha, div.h-captcha, iframe[src*='hcaptcha']";

/// Phrases matched case-insensitively against visible text
const CHALLENGE_PHRASES: &[&str] = &[
    "captcha",
    "verify you are human",
    "are you a robot",
    "press and hold",
    "cloudflare verify",
];

/// Returns true when the markup looks like an anti-bot challenge page
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::detect_challenge;
///
/// assert!(detect_challenge(r#"<div class="g-recaptcha"></div>"#));
/// assert!(!detect_challenge("<p>Welcome</p>"));
/// ```
pub fn detect_challenge(markup: &str) -> bool {
    let document = Html::parse_document(markup);

    if let Ok(selector) = Selector::parse(CHALLENGE_SELECTORS) {
        if document.select(&selector).next().is_some() {
            return true;
        }
    }

    let text = document_text(&document).to_lowercase();
    CHALLENGE_PHRASES.iter().any(|phrase| text.contains(phrase))
}
