//! Delimited-text export of crawl tables
//!
//! Output is UTF-8 CSV with a header row and one row per record.

use crate::output::Table;
use crate::HarvestError;
use std::io::{Read, Write};
use std::path::Path;

/// Writes a table as CSV to any writer
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<(), HarvestError> {
    let mut writer = csv::Writer::from_writer(writer);

    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Renders a table to a CSV string
pub fn to_csv_string(table: &Table) -> Result<String, HarvestError> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| HarvestError::Io(std::io::Error::other(e)))
}

/// Writes a table as CSV to a file, creating or truncating it
pub fn write_csv_file(table: &Table, path: &Path) -> Result<(), HarvestError> {
    let file = std::fs::File::create(path)?;
    write_csv(table, std::io::BufWriter::new(file))?;
    tracing::info!(
        "Wrote {} rows x {} columns to {}",
        table.row_count(),
        table.columns.len(),
        path.display()
    );
    Ok(())
}

/// Reads CSV produced by [`write_csv`] back into a table
pub fn read_csv_table<R: Read>(reader: R) -> Result<Table, HarvestError> {
    let mut reader = csv::Reader::from_reader(reader);

    let columns = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { columns, rows })
}
