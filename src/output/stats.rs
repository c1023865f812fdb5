//! Crawl summary statistics
//!
//! This module turns a finished crawl into a small summary and prints it.

use crate::crawler::CrawlResult;
use crate::output::{CrawlData, SOURCE_URL_FIELD};
use crate::state::StopReason;
use std::collections::BTreeSet;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    /// Number of pages fetched (including the page a challenge was found on)
    pub pages_fetched: usize,

    /// Number of pages that produced records
    pub batches: usize,

    /// Total number of extracted records
    pub records: usize,

    /// Distinct column names across the result
    pub columns: BTreeSet<String>,

    /// Whether batches were merged into one table
    pub merged: bool,

    /// Why the crawl stopped
    pub stop_reason: StopReason,

    /// Policy gate explanation
    pub policy_reason: String,

    /// Wall-clock duration in milliseconds
    pub elapsed_ms: i64,
}

/// Computes statistics for a finished crawl
pub fn load_statistics(result: &CrawlResult) -> CrawlStatistics {
    let (batches, merged) = match &result.data {
        CrawlData::Empty => (0, false),
        CrawlData::Table(table) => (
            (0..table.row_count())
                .filter_map(|row| table.cell(row, SOURCE_URL_FIELD))
                .collect::<BTreeSet<_>>()
                .len(),
            true,
        ),
        CrawlData::Batches(batches) => (batches.len(), false),
    };

    CrawlStatistics {
        pages_fetched: result.pages_fetched,
        batches,
        records: result.data.record_count(),
        columns: result.data.to_export_table().column_set(),
        merged,
        stop_reason: result.stop_reason,
        policy_reason: result.policy.reason.clone(),
        elapsed_ms: (result.finished_at - result.started_at).num_milliseconds(),
    }
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Sumi-Harvest Crawl Summary ===\n");

    println!("Pages fetched: {}", stats.pages_fetched);
    println!("Pages with records: {}", stats.batches);
    println!("Records extracted: {}", stats.records);
    println!(
        "Result shape: {}",
        if stats.merged {
            "unified table"
        } else if stats.records == 0 {
            "empty"
        } else {
            "per-page batches (schemas differ)"
        }
    );

    if !stats.columns.is_empty() {
        println!("\nColumns ({}):", stats.columns.len());
        for column in &stats.columns {
            println!("  - {}", column);
        }
    }

    println!("\nStop reason: {}", stats.stop_reason);
    println!("robots.txt: {}", stats.policy_reason);
    println!("Elapsed: {:.2}s", stats.elapsed_ms as f64 / 1000.0);
}
