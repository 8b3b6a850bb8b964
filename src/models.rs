use csv::ByteRecord;
use serde::{Deserialize, Serialize};

/// A gazetteer entry: canonical country name and the aliases it is matched by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryEntry {
    pub name: String,
    pub aliases: Vec<String>,
}

/// The four corpus fields the scanner consumes, borrowed from a raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRow<'a> {
    pub title: &'a str,
    pub abstract_text: &'a str,
    pub journal: &'a str,
    pub date: &'a str,
}

/// A contiguous slice of corpus rows processed as one unit of parallel work
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position of this chunk in submission order (0-based)
    pub index: usize,
    /// 1-based row number of the first row
    pub start_row: usize,
    pub rows: Vec<ByteRecord>,
}

impl Chunk {
    pub fn new(index: usize, start_row: usize, rows: Vec<ByteRecord>) -> Self {
        Self {
            index,
            start_row,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row number of the last row, or `None` for an empty chunk
    pub fn end_row(&self) -> Option<usize> {
        last_row(self.start_row, self.rows.len())
    }

    /// Pairs every raw record with its 1-based row number
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &ByteRecord)> {
        self.rows
            .iter()
            .enumerate()
            .map(move |(i, record)| (self.start_row + i, record))
    }
}

/// Last row number of `rows` consecutive rows starting at `start_row`
pub fn last_row(start_row: usize, rows: usize) -> Option<usize> {
    rows.checked_sub(1).map(|n| start_row + n)
}

/// One output row: a corpus row in which at least one country was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub row_num: usize,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub journal: String,
    pub date: String,
    pub title_country: String,
    pub abstract_country: String,
}
