//! Orchestrator-local crawl state
//!
//! Created when a crawl starts, mutated once per loop iteration and consumed
//! when the crawl finishes. Never shared.

use crate::output::PageBatch;
use crate::state::CrawlPhase;
use crate::HarvestError;
use url::Url;

/// Mutable state of one running crawl
#[derive(Debug)]
pub struct CrawlState {
    /// The page being (or about to be) fetched
    current: Url,

    /// Number of fetches performed so far
    pages_fetched: usize,

    /// Non-empty batches collected so far, in crawl order
    batches: Vec<PageBatch>,

    /// Current phase of the loop
    phase: CrawlPhase,
}

impl CrawlState {
    /// Creates state for a crawl starting at `seed`
    pub fn new(seed: Url) -> Self {
        Self {
            current: seed,
            pages_fetched: 0,
            batches: Vec::new(),
            phase: CrawlPhase::Init,
        }
    }

    pub fn current(&self) -> &Url {
        &self.current
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn batches(&self) -> &[PageBatch] {
        &self.batches
    }

    /// Moves to `next`, rejecting transitions the phase machine does not allow
    pub fn transition(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// Counts one fetch of the current page
    pub fn record_fetch(&mut self) {
        self.pages_fetched += 1;
    }

    /// Appends a batch; empty batches are dropped
    pub fn push_batch(&mut self, batch: PageBatch) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }

    /// Points the crawl at the next page
    pub fn advance_to(&mut self, next: Url) {
        self.current = next;
    }

    /// Consumes the state, yielding the collected batches
    pub fn into_batches(self) -> Vec<PageBatch> {
        self.batches
    }
}
