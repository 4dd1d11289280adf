//! CSV reading and writing for uploaded and generated tables

use std::path::Path;

use tracing::debug;

use crate::domain::{DataTable, DomainError};

/// Detect `;` vs `,` by field-count consistency over the first lines
///
/// Falls back to `,` when neither candidate splits the header.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b';', b','];
    let sample_lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = counts.first().copied().unwrap_or(0);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Parse CSV text with an auto-detected delimiter
pub fn parse_table(content: &str) -> Result<DataTable, DomainError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let delimiter = sniff_delimiter(content);
    parse_table_with(content, delimiter)
}

pub fn parse_table_with(content: &str, delimiter: u8) -> Result<DataTable, DomainError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| DomainError::csv(format!("cannot read header row: {}", e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(DomainError::csv("file has no header row"));
    }

    let mut table = DataTable::new(headers);
    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| DomainError::csv(format!("line {}: {}", index + 2, e)))?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(str::to_string).collect());
    }

    debug!(
        delimiter = %(delimiter as char),
        columns = table.headers().len(),
        rows = table.n_rows(),
        "Parsed CSV"
    );

    Ok(table)
}

/// Parse raw upload bytes, rejecting non-UTF-8 content
pub fn parse_bytes(bytes: &[u8]) -> Result<DataTable, DomainError> {
    let content = std::str::from_utf8(bytes)
        .map_err(|e| DomainError::csv(format!("file is not valid UTF-8: {}", e)))?;
    parse_table(content)
}

pub fn read_table(path: &Path) -> Result<DataTable, DomainError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| DomainError::csv(format!("cannot read {}: {}", path.display(), e)))?;
    parse_table(&content)
}

pub fn to_csv_string(table: &DataTable, delimiter: u8) -> Result<String, DomainError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer
        .write_record(table.headers())
        .map_err(|e| DomainError::csv(e.to_string()))?;
    for row in table.rows() {
        writer
            .write_record(row)
            .map_err(|e| DomainError::csv(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DomainError::csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DomainError::csv(e.to_string()))
}

pub fn write_table(table: &DataTable, path: &Path, delimiter: u8) -> Result<(), DomainError> {
    let content = to_csv_string(table, delimiter)?;
    std::fs::write(path, content)
        .map_err(|e| DomainError::csv(format!("cannot write {}: {}", path.display(), e)))
}
