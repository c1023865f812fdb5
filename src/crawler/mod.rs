//! Crawler module for page fetching and processing
//!
//! This module contains the core harvesting pipeline, including:
//! - Static and rendered page fetching
//! - Challenge (captcha) detection
//! - Record extraction from selectors, tables and page structure
//! - Next-page discovery
//! - Overall crawl coordination

mod browser;
mod challenge;
mod coordinator;
mod fetcher;
mod pagination;
mod parser;
mod tables;

pub use browser::{error_placeholder, RenderedFetcher, SETTLE_DELAY};
pub use challenge::detect_challenge;
pub use coordinator::{Coordinator, CrawlResult, Preflight};
pub use fetcher::{
    build_http_client, fetcher_for, FetchRequest, FetchResult, PageFetcher, StaticFetcher,
};
pub use pagination::find_next_page;
pub use parser::{auto_extract, extract_by_selector, parse_selector};

use crate::config::HarvestConfig;
use crate::HarvestError;

/// Runs a complete harvest
///
/// This is the main entry point for a crawl. It will:
/// 1. Validate the configuration and pick a fetcher
/// 2. Consult robots.txt for the seed's origin
/// 3. Fetch, check and extract each page
/// 4. Follow next-page links up to the configured bound
///
/// # Arguments
///
/// * `config` - The harvest configuration
///
/// # Returns
///
/// * `Ok(CrawlResult)` - Crawl finished (possibly early, see `stop_reason`)
/// * `Err(HarvestError)` - Invalid configuration or a transport failure
pub async fn harvest(config: HarvestConfig) -> Result<CrawlResult, HarvestError> {
    Coordinator::new(config)?.run().await
}
