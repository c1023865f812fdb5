//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one crawl through its phases:
//! - Consulting the robots.txt policy gate once, before anything is fetched
//! - Fetching each page with the configured strategy
//! - Stopping early on an anti-automation challenge
//! - Extracting records and collecting per-page batches
//! - Following "next page" links up to the page bound, with a politeness delay

use crate::config::{validate, HarvestConfig};
use crate::crawler::challenge::detect_challenge;
use crate::crawler::fetcher::{fetcher_for, FetchRequest, PageFetcher};
use crate::crawler::pagination::find_next_page;
use crate::crawler::parser::{auto_extract, extract_by_selector, parse_selector};
use crate::output::{merge_batches, CrawlData, PageBatch, Record};
use crate::robots::{PolicyDecision, PolicyGate, ROBOTS_TIMEOUT};
use crate::state::{CrawlPhase, CrawlState, StopReason};
use crate::url::parse_seed_url;
use crate::{ConfigError, HarvestError};
use chrono::{DateTime, Utc};
use scraper::Selector;
use url::Url;

/// Outcome of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// Collected records: empty, one merged table, or per-page batches
    pub data: CrawlData,

    /// Why the crawl stopped
    pub stop_reason: StopReason,

    /// The robots.txt decision the crawl ran under
    pub policy: PolicyDecision,

    /// Number of fetches performed
    pub pages_fetched: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Result of checking the seed page before a crawl
#[derive(Debug, Clone)]
pub struct Preflight {
    pub policy: PolicyDecision,

    /// True when the seed page is a challenge page
    pub challenge_detected: bool,

    /// Set when the rendered fetch of the seed page failed
    pub fetch_error: Option<String>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: HarvestConfig,
    seed: Url,
    selector: Option<Selector>,
    fetcher: Box<dyn PageFetcher>,
    policy_gate: PolicyGate,
    policy: Option<PolicyDecision>,
}

impl Coordinator {
    /// Creates a coordinator using the fetcher selected by the config
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration or client setup failure
    pub fn new(config: HarvestConfig) -> Result<Self, HarvestError> {
        let fetcher = fetcher_for(config.fetch.strategy)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a coordinator with an explicit fetcher implementation
    pub fn with_fetcher(
        config: HarvestConfig,
        fetcher: Box<dyn PageFetcher>,
    ) -> Result<Self, HarvestError> {
        validate(&config)?;

        let seed = parse_seed_url(&config.crawl.seed_url).map_err(ConfigError::InvalidUrl)?;
        let selector = config.selector().map(parse_selector).transpose()?;
        let policy_gate = PolicyGate::new(ROBOTS_TIMEOUT)?;

        Ok(Self {
            config,
            seed,
            selector,
            fetcher,
            policy_gate,
            policy: None,
        })
    }

    /// Uses an already-made policy decision instead of fetching robots.txt
    pub fn with_policy_decision(mut self, decision: PolicyDecision) -> Self {
        self.policy = Some(decision);
        self
    }

    pub fn seed(&self) -> &Url {
        &self.seed
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Returns the policy decision, consulting robots.txt at most once
    async fn policy(&mut self) -> PolicyDecision {
        if let Some(decision) = &self.policy {
            return decision.clone();
        }
        let decision = self
            .policy_gate
            .check(&self.seed, &self.config.fetch.user_agent)
            .await;
        self.policy = Some(decision.clone());
        decision
    }

    /// Checks policy and fetches the seed page once to look for a challenge
    ///
    /// The policy decision is kept and reused by a following [`Coordinator::run`].
    pub async fn preflight(&mut self) -> Result<Preflight, HarvestError> {
        let policy = self.policy().await;
        if !policy.allowed {
            return Ok(Preflight {
                policy,
                challenge_detected: false,
                fetch_error: None,
            });
        }

        let request = FetchRequest::from_config(&self.config, self.seed.clone());
        let fetched = self.fetcher.fetch(&request).await?;
        let challenge_detected = detect_challenge(&fetched.markup);
        if challenge_detected {
            tracing::warn!("Challenge detected on seed page {}", self.seed);
        }

        Ok(Preflight {
            policy,
            challenge_detected,
            fetch_error: fetched.error,
        })
    }

    /// Runs the crawl loop
    ///
    /// Transport failures of the static fetcher abort the crawl and discard
    /// everything collected so far.
    pub async fn run(&mut self) -> Result<CrawlResult, HarvestError> {
        let started_at = Utc::now();
        let mut state = CrawlState::new(self.seed.clone());

        state.transition(CrawlPhase::PolicyCheck)?;
        let policy = self.policy().await;
        if !policy.allowed {
            tracing::warn!("Crawl of {} blocked: {}", self.seed, policy.reason);
            state.transition(CrawlPhase::Done)?;
            return Ok(self.finish(state, StopReason::PolicyBlocked, policy, started_at));
        }

        let max_pages = self.config.crawl.max_pages as usize;
        let delay = self.config.delay();

        let stop_reason = loop {
            state.transition(CrawlPhase::Fetching)?;
            let request = FetchRequest::from_config(&self.config, state.current().clone());
            tracing::info!(
                "Fetching page {}/{}: {}",
                state.pages_fetched() + 1,
                max_pages,
                request.url
            );
            let fetched = self.fetcher.fetch(&request).await?;
            state.record_fetch();

            if let Some(error) = &fetched.error {
                tracing::warn!(
                    "Continuing with placeholder markup for {}: {}",
                    request.url,
                    error
                );
            }

            state.transition(CrawlPhase::ChallengeCheck)?;
            if detect_challenge(&fetched.markup) {
                tracing::warn!(
                    "Challenge detected on {}, stopping after {} page(s)",
                    request.url,
                    state.pages_fetched()
                );
                break StopReason::ChallengeDetected;
            }

            state.transition(CrawlPhase::Extracting)?;
            let records = self.extract(&fetched.markup, state.current());
            tracing::debug!("Extracted {} records from {}", records.len(), request.url);
            state.push_batch(PageBatch::new(state.current().as_str(), records));

            state.transition(CrawlPhase::PaginationCheck)?;
            if !self.config.crawl.follow_pagination {
                break StopReason::PaginationDisabled;
            }

            let next = match find_next_page(&fetched.markup, state.current()) {
                Some(mut next) => {
                    // A fragment never names a different document
                    next.set_fragment(None);
                    if same_document(&next, state.current()) {
                        tracing::debug!("Next link of {} points to itself", request.url);
                        break StopReason::PaginationExhausted;
                    }
                    next
                }
                None => {
                    tracing::debug!("No next page after {}", request.url);
                    break StopReason::PaginationExhausted;
                }
            };

            if state.pages_fetched() >= max_pages {
                tracing::info!("Reached max pages ({}), not following {}", max_pages, next);
                break StopReason::MaxPagesReached;
            }

            tracing::debug!("Next page: {}", next);
            state.advance_to(next);

            if !delay.is_zero() {
                state.transition(CrawlPhase::Delaying)?;
                tokio::time::sleep(delay).await;
            }
        };

        state.transition(CrawlPhase::Done)?;
        Ok(self.finish(state, stop_reason, policy, started_at))
    }

    /// Applies the selector, falling back to automatic extraction
    fn extract(&self, markup: &str, page_url: &Url) -> Vec<Record> {
        if let Some(selector) = &self.selector {
            let records = extract_by_selector(markup, selector);
            if !records.is_empty() {
                return records;
            }
            tracing::debug!(
                "Selector matched nothing on {}, using automatic extraction",
                page_url
            );
        }
        auto_extract(markup, Some(page_url))
    }

    fn finish(
        &self,
        state: CrawlState,
        stop_reason: StopReason,
        policy: PolicyDecision,
        started_at: DateTime<Utc>,
    ) -> CrawlResult {
        let pages_fetched = state.pages_fetched();
        let data = merge_batches(state.into_batches());

        tracing::info!(
            "Crawl finished ({}): {} page(s) fetched, {} record(s)",
            stop_reason,
            pages_fetched,
            data.record_count()
        );

        CrawlResult {
            data,
            stop_reason,
            policy,
            pages_fetched,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

fn same_document(a: &Url, b: &Url) -> bool {
    a.as_str().split('#').next() == b.as_str().split('#').next()
}
