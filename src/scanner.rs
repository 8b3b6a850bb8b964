use crate::config::{COUNTRY_SEPARATOR, MIN_CORPUS_FIELDS};
use crate::models::{Chunk, InputRow, MatchRecord};
use crate::patterns::CountryPatterns;
use csv::ByteRecord;
use thiserror::Error;
use tracing::trace;

const FIELD_NAMES: [&str; MIN_CORPUS_FIELDS] = ["title", "abstract", "journal", "date"];

/// Why a chunk produced no records
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("row {row_num}: {field} is not valid UTF-8")]
    InvalidUtf8 { row_num: usize, field: &'static str },

    #[error("worker panicked: {message}")]
    Panicked { message: String },
}

/// Result of scanning one chunk: every match in it, or the reason it was lost
pub type ChunkOutcome = Result<Vec<MatchRecord>, ScanError>;

/// Borrows the four consumed fields of a raw record. Records with fewer than
/// four fields yield `Ok(None)`.
pub fn decode_row(record: &ByteRecord, row_num: usize) -> Result<Option<InputRow<'_>>, ScanError> {
    if record.len() < MIN_CORPUS_FIELDS {
        return Ok(None);
    }

    let mut fields = [""; MIN_CORPUS_FIELDS];
    for (i, field) in fields.iter_mut().enumerate() {
        *field = std::str::from_utf8(&record[i]).map_err(|_| ScanError::InvalidUtf8 {
            row_num,
            field: FIELD_NAMES[i],
        })?;
    }

    let [title, abstract_text, journal, date] = fields;
    Ok(Some(InputRow {
        title,
        abstract_text,
        journal,
        date,
    }))
}

/// Looks for countries in the title and abstract of one row. Returns `None`
/// when neither field mentions any country.
pub fn scan_row(row_num: usize, row: InputRow<'_>, patterns: &CountryPatterns) -> Option<MatchRecord> {
    let title_countries = patterns.countries_in(row.title);
    let abstract_countries = patterns.countries_in(row.abstract_text);

    if title_countries.is_empty() && abstract_countries.is_empty() {
        return None;
    }

    Some(MatchRecord {
        row_num,
        title: row.title.to_string(),
        abstract_text: row.abstract_text.to_string(),
        journal: row.journal.to_string(),
        date: row.date.to_string(),
        title_country: title_countries.join(COUNTRY_SEPARATOR),
        abstract_country: abstract_countries.join(COUNTRY_SEPARATOR),
    })
}

/// Scans every row of a chunk. The first undecodable row fails the whole chunk.
pub fn scan_chunk(chunk: &Chunk, patterns: &CountryPatterns) -> ChunkOutcome {
    let mut records = Vec::new();
    for (row_num, record) in chunk.numbered_rows() {
        let Some(row) = decode_row(record, row_num)? else {
            trace!(row_num, fields = record.len(), "Skipping short row");
            continue;
        };
        if let Some(found) = scan_row(row_num, row, patterns) {
            records.push(found);
        }
    }
    Ok(records)
}
