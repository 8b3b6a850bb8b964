use crate::config::ROW_NUM_COLUMN;
use anyhow::{Context, Result};
use csv::{Reader, StringRecord, Writer};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Reorders an unsorted mentions table by `row_num`, ascending. Rows with
/// equal row numbers keep their relative order and no field is rewritten.
/// Returns the number of rows written.
pub fn sort_mentions(input: &Path, output: &Path) -> Result<usize> {
    println!("Reading {}...", input.display());
    let (headers, mut rows) = read_rows(input)?;

    println!("Sorting by {}...", ROW_NUM_COLUMN);
    rows.sort_by_key(|(row_num, _)| *row_num);

    println!("Writing sorted data to {}...", output.display());
    write_rows(output, &headers, &rows)?;

    info!(rows = rows.len(), output = %output.display(), "Sort complete");
    Ok(rows.len())
}

/// Reads the header and every data row keyed by its parsed `row_num`
fn read_rows(path: &Path) -> Result<(StringRecord, Vec<(i64, StringRecord)>)> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open mentions table: {}", path.display()))?;
    let mut reader = Reader::from_reader(BufReader::with_capacity(256 * 1024, file));

    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h == ROW_NUM_COLUMN)
        .with_context(|| format!("Missing {} column in {}", ROW_NUM_COLUMN, path.display()))?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw = record
            .get(column)
            .with_context(|| format!("Missing {} on line {}", ROW_NUM_COLUMN, line))?;
        let row_num: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} {:?} on line {}", ROW_NUM_COLUMN, raw, line))?;
        rows.push((row_num, record));
    }
    Ok((headers, rows))
}

fn write_rows(path: &Path, headers: &StringRecord, rows: &[(i64, StringRecord)]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create sorted table: {}", path.display()))?;
    let mut writer = Writer::from_writer(BufWriter::with_capacity(256 * 1024, file));

    writer.write_record(headers)?;
    for (_, record) in rows {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}
