//! HTML table parsing into records
//!
//! Header detection:
//! - rows inside `<thead>` are header rows
//! - without a `<thead>`, leading rows made only of `<th>` cells are header rows
//! - without any header row, columns are named by position ("0", "1", ...)
//!
//! Cells spanning several columns or rows are repeated into every slot they
//! cover. Short rows are padded with empty cells. Repeated header names get a
//! numeric suffix ("Name", "Name.1").

use crate::crawler::parser::element_text;
use crate::output::Record;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

/// Upper bound for colspan/rowspan attributes
const MAX_SPAN: usize = 1000;

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    is_header: bool,
    colspan: usize,
    rowspan: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Head,
    Body,
}

/// Parses every table in the document and concatenates their rows
///
/// # Returns
///
/// * `None` - The document has no table with any text
/// * `Some(records)` - All rows of all tables, in document order; may be
///   empty when the tables only have header rows
pub fn table_records(document: &Html) -> Option<Vec<Record>> {
    let selector = Selector::parse("table").ok()?;

    let tables: Vec<ElementRef> = document
        .select(&selector)
        .filter(|table| table.text().any(|t| !t.trim().is_empty()))
        .collect();

    if tables.is_empty() {
        return None;
    }

    Some(tables.into_iter().flat_map(parse_table).collect())
}

/// Parses one table into records keyed by column name
fn parse_table(table: ElementRef) -> Vec<Record> {
    let rows = table_rows(table);

    let has_thead = rows.iter().any(|(section, _)| *section == Section::Head);
    let mut header_rows = Vec::new();
    let mut body_rows = Vec::new();

    for (section, cells) in rows {
        let is_header = if has_thead {
            section == Section::Head
        } else {
            body_rows.is_empty() && !cells.is_empty() && cells.iter().all(|c| c.is_header)
        };
        if is_header {
            header_rows.push(cells);
        } else if !cells.is_empty() {
            body_rows.push(cells);
        }
    }

    let header_grid = expand_spans(header_rows);
    let body_grid = expand_spans(body_rows);

    let width = body_grid
        .iter()
        .chain(header_grid.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let columns = column_names(&header_grid, width);

    body_grid
        .into_iter()
        .map(|row| {
            let mut record = Record::new();
            for (index, name) in columns.iter().enumerate() {
                let value = row.get(index).cloned().unwrap_or_default();
                record.insert(name.as_str(), value);
            }
            record
        })
        .collect()
}

/// Collects the table's own rows, skipping rows of nested tables
fn table_rows(table: ElementRef) -> Vec<(Section, Vec<Cell>)> {
    let mut rows = Vec::new();

    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push((Section::Body, row_cells(child))),
            "thead" | "tbody" | "tfoot" => {
                let section = if child.value().name() == "thead" {
                    Section::Head
                } else {
                    Section::Body
                };
                for row in child.children().filter_map(ElementRef::wrap) {
                    if row.value().name() == "tr" {
                        rows.push((section, row_cells(row)));
                    }
                }
            }
            _ => {}
        }
    }

    rows
}

fn row_cells(row: ElementRef) -> Vec<Cell> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| Cell {
            text: element_text(cell),
            is_header: cell.value().name() == "th",
            colspan: span_attr(cell, "colspan"),
            rowspan: span_attr(cell, "rowspan"),
        })
        .collect()
}

fn span_attr(cell: ElementRef, name: &str) -> usize {
    cell.value()
        .attr(name)
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .map_or(1, |n| n.min(MAX_SPAN))
}

/// Lays out cells on a grid, repeating spanned cells
fn expand_spans(rows: Vec<Vec<Cell>>) -> Vec<Vec<String>> {
    // column -> (rows still covered, text)
    let mut carried: HashMap<usize, (usize, String)> = HashMap::new();
    let mut grid = Vec::with_capacity(rows.len());

    for cells in rows {
        let mut out: Vec<String> = Vec::new();
        let mut cells = cells.into_iter();

        loop {
            let column = out.len();
            if let Some((remaining, text)) = carried.get_mut(&column) {
                out.push(text.clone());
                *remaining -= 1;
                if *remaining == 0 {
                    carried.remove(&column);
                }
                continue;
            }

            let Some(cell) = cells.next() else {
                break;
            };
            for _ in 0..cell.colspan {
                if cell.rowspan > 1 {
                    carried.insert(out.len(), (cell.rowspan - 1, cell.text.clone()));
                }
                out.push(cell.text.clone());
            }
        }

        grid.push(out);
    }

    grid
}

/// Derives unique column names from the header grid
fn column_names(header_grid: &[Vec<String>], width: usize) -> Vec<String> {
    let raw: Vec<String> = if header_grid.is_empty() {
        (0..width).map(|i| i.to_string()).collect()
    } else {
        (0..width)
            .map(|i| {
                let mut parts: Vec<&str> = Vec::new();
                for row in header_grid {
                    if let Some(part) = row.get(i).map(String::as_str) {
                        if !part.is_empty() && parts.last() != Some(&part) {
                            parts.push(part);
                        }
                    }
                }
                if parts.is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    parts.join(" ")
                }
            })
            .collect()
    };

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(raw.len());
    for name in raw {
        let mut candidate = name.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{}.{}", name, count);
        }
        seen.insert(candidate.clone(), 0);
        names.push(candidate);
    }
    names
}
