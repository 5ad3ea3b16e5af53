use crate::errors::{AppError, AppResult};
use crate::models::CsvTable;
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

/// Splits raw text on bare commas; quote characters are ordinary data.
///
/// The first non-blank line is the header. Data rows whose cell count differs
/// from the header, and rows made only of blank cells, are dropped.
pub fn parse(text: &str) -> AppResult<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(ToString::to_string).collect(),
        None => return Ok(CsvTable::default()),
    };

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in records {
        let record = record?;
        let row: Vec<String> = record.iter().map(ToString::to_string).collect();
        if row.len() != headers.len() || row.iter().all(|cell| cell.trim().is_empty()) {
            dropped += 1;
            continue;
        }
        rows.push(row);
    }

    if dropped > 0 {
        tracing::debug!(dropped, columns = headers.len(), "dropped csv rows with mismatched or empty cells");
    }

    Ok(CsvTable { headers, rows })
}

/// Header plus every row, comma-joined without quoting, one row per line.
pub fn export(table: &CsvTable) -> AppResult<String> {
    if table.headers.is_empty() && table.rows.is_empty() {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .flexible(true)
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| AppError::Internal(error.to_string()))?;
    String::from_utf8(bytes).map_err(|error| AppError::Internal(error.to_string()))
}
