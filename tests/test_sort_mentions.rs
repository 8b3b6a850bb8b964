//! Tests for the sort stage, alone and chained after a scan.
//!
//! `sort::sort_mentions()` reads the unsorted mentions table, orders rows by
//! `row_num` with a stable sort, and writes every column back untouched.

use anyhow::Result;
use country_mentions::config::{AliasFilter, ScanConfig};
use country_mentions::pipeline;
use country_mentions::sort;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str = "row_num,title,abstract,journal,date,title_country,abstract_country";

/// Helper to create an unsorted mentions table from raw CSV lines.
fn create_table(dir: &Path, name: &str, rows: &[&str]) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    let mut content = String::from(HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content)?;
    Ok(path)
}

fn row_nums(path: &Path) -> Result<Vec<i64>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut nums = Vec::new();
    for result in reader.records() {
        nums.push(result?[0].parse()?);
    }
    Ok(nums)
}

#[test]
fn test_sort_restores_row_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_table(
        temp_dir.path(),
        "unsorted.csv",
        &[
            "3,Peru three,a,J,2020,Peru,",
            "1,Peru one,a,J,2020,Peru,",
            "20001,\"Quoted, title\",\"multi\nline\",J,2021,,Chile",
            "2,Peru two,a,J,2020,Peru,",
        ],
    )?;
    let output = temp_dir.path().join("sorted.csv");

    let rows = sort::sort_mentions(&input, &output)?;
    assert_eq!(rows, 4);
    assert_eq!(row_nums(&output)?, vec![1, 2, 3, 20001]);

    // Fields with separators and newlines survive unchanged
    let mut reader = csv::Reader::from_path(&output)?;
    let last = reader.records().last().unwrap()?;
    assert_eq!(&last[1], "Quoted, title");
    assert_eq!(&last[2], "multi\nline");
    assert_eq!(&last[6], "Chile");
    Ok(())
}

#[test]
fn test_sort_is_idempotent() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let input = create_table(
        temp_dir.path(),
        "unsorted.csv",
        &[
            "7,b,a,J,D,Peru,",
            "5,a,\"x, y\",J,D,,Peru",
            "7,c,a,J,D,Peru,",
            "6,d,a,J,D,Peru,Peru",
        ],
    )?;
    let once = temp_dir.path().join("once.csv");
    let twice = temp_dir.path().join("twice.csv");

    sort::sort_mentions(&input, &once)?;
    sort::sort_mentions(&once, &twice)?;

    assert_eq!(fs::read(&once)?, fs::read(&twice)?);
    Ok(())
}

#[test]
fn test_sort_missing_input_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = sort::sort_mentions(
        &temp_dir.path().join("missing.csv"),
        &temp_dir.path().join("sorted.csv"),
    );
    assert!(result.is_err());
    assert!(!temp_dir.path().join("sorted.csv").exists());
}

#[test]
fn test_scan_then_sort() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let countries = temp_dir.path().join("countries.csv");
    fs::write(&countries, "country,aliases\nKenya,\nChile,\n")?;

    let mut corpus = String::from("title,abstract,journal,date\n");
    for i in 1..=40 {
        let country = if i % 3 == 0 { "Kenya" } else { "Chile" };
        let title = if i % 5 == 0 { "Nothing here" } else { country };
        corpus.push_str(&format!("{title},abstract {i},J,2020\n"));
    }
    let corpus_path = temp_dir.path().join("corpus.csv");
    fs::write(&corpus_path, corpus)?;

    let unsorted = temp_dir.path().join("country_mentions.csv");
    let cfg = ScanConfig {
        countries_path: countries,
        corpus_path,
        output_path: unsorted.clone(),
        workers: Some(4),
        max_chunk_rows: 3,
        alias_filter: AliasFilter::default(),
    };
    let report = pipeline::run_scan(&cfg)?;
    assert!(report.is_complete());
    assert_eq!(report.plan.num_chunks, 14);

    let sorted = temp_dir.path().join("country_mentions_sorted.csv");
    let rows = sort::sort_mentions(&unsorted, &sorted)?;

    let expected: Vec<i64> = (1..=40).filter(|i| i % 5 != 0).collect();
    assert_eq!(rows, expected.len());
    assert_eq!(row_nums(&sorted)?, expected);
    Ok(())
}
