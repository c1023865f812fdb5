//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: The phase machine of the pagination loop
//! - `StopReason`: Named terminal conditions surfaced with the result
//! - `CrawlState`: Orchestrator-owned state for one crawl

mod crawl_phase;
mod crawl_state;

// Re-export main types
pub use crawl_phase::{CrawlPhase, StopReason};
pub use crawl_state::CrawlState;
