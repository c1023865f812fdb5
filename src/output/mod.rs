//! Output module for crawl results
//!
//! This module handles:
//! - The record / batch / table data model
//! - Merging per-page batches into a unified table
//! - CSV export of the unified table
//! - Crawl summary statistics

mod csv_export;
pub mod stats;
mod table;

pub use csv_export::{read_csv_table, to_csv_string, write_csv, write_csv_file};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
pub use table::{merge_batches, CrawlData, PageBatch, Record, Table, SOURCE_URL_FIELD};
