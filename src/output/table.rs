//! Record, batch and table types
//!
//! Extraction produces ragged records: table rows carry the table's column
//! names, headings and paragraphs carry `type`/`content`, links carry
//! `type`/`text`/`href`.
//! Batches are merged into one table only when every batch has the same key set.

use std::collections::BTreeSet;

/// Name of the provenance column prepended to every record of a batch
pub const SOURCE_URL_FIELD: &str = "_source_url";

/// One extracted record: an ordered list of named fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a field, replacing the value in place if the key already exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    /// Puts a field at the front of the record, removing any previous value for the key
    pub fn prepend(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.fields.retain(|(k, _)| *k != key);
        self.fields.insert(0, (key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Field names in order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// All records extracted from one fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBatch {
    /// The page the records came from
    pub source_url: String,

    /// Extracted records, each starting with `_source_url`
    pub records: Vec<Record>,
}

impl PageBatch {
    /// Creates a batch, prepending `_source_url` to every record
    pub fn new(source_url: impl Into<String>, records: Vec<Record>) -> Self {
        let source_url = source_url.into();
        let records = records
            .into_iter()
            .map(|mut record| {
                record.prepend(SOURCE_URL_FIELD, source_url.clone());
                record
            })
            .collect();

        Self {
            source_url,
            records,
        }
    }

    /// The set of field names used anywhere in the batch
    pub fn schema(&self) -> BTreeSet<String> {
        self.records
            .iter()
            .flat_map(|r| r.keys().map(str::to_string))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Converts the batch to a table (columns in first-seen order)
    pub fn to_table(&self) -> Table {
        Table::from_records(&self.records)
    }
}

/// A rectangular table with named columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Builds a table from records; missing cells become empty strings
    pub fn from_records(records: &[Record]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.to_string());
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| record.get(c).unwrap_or_default().to_string())
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Row-union of several batches, used to export a batch sequence as one file
    pub fn union_of(batches: &[PageBatch]) -> Self {
        let records: Vec<Record> = batches
            .iter()
            .flat_map(|b| b.records.iter().cloned())
            .collect();
        Self::from_records(&records)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_set(&self) -> BTreeSet<String> {
        self.columns.iter().cloned().collect()
    }

    /// Returns the cell at `row` for the named column
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The data a crawl produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlData {
    /// Nothing was extracted
    Empty,

    /// Every batch shared one schema and was merged
    Table(Table),

    /// Schemas differed, batches are returned in crawl order
    Batches(Vec<PageBatch>),
}

impl CrawlData {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Total number of records regardless of shape
    pub fn record_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Table(table) => table.row_count(),
            Self::Batches(batches) => batches.iter().map(PageBatch::len).sum(),
        }
    }

    /// A single table for export: the merged table, or the row-union of the batches
    pub fn to_export_table(&self) -> Table {
        match self {
            Self::Empty => Table::default(),
            Self::Table(table) => table.clone(),
            Self::Batches(batches) => Table::union_of(batches),
        }
    }
}

/// Merges batches into one table when all schemas match
///
/// Empty input gives `CrawlData::Empty`. Batches whose key sets differ are
/// returned unmerged as `CrawlData::Batches`; that is a fallback, not a failure.
pub fn merge_batches(batches: Vec<PageBatch>) -> CrawlData {
    let Some(first) = batches.first() else {
        return CrawlData::Empty;
    };

    let schema = first.schema();
    if batches.iter().all(|b| b.schema() == schema) {
        let records: Vec<Record> = batches.into_iter().flat_map(|b| b.records).collect();
        CrawlData::Table(Table::from_records(&records))
    } else {
        tracing::debug!(
            "Batch schemas differ across {} pages, returning them unmerged",
            batches.len()
        );
        CrawlData::Batches(batches)
    }
}
