//! End-to-end tests for the scan stage.
//!
//! Each test writes a small gazetteer and corpus into its own `TempDir`, runs
//! `pipeline::run_scan` with an explicit `ScanConfig`, and reads the unsorted
//! output back through `csv` + `serde` as `MatchRecord`s.
//!
//! Because chunks are collected in completion order, assertions on the
//! unsorted table compare row sets, never row order.

use anyhow::Result;
use country_mentions::config::{AliasFilter, ScanConfig};
use country_mentions::models::MatchRecord;
use country_mentions::pipeline::{self, ScanReport};
use country_mentions::scanner::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const COUNTRIES: &str = "\
country,aliases
United States,USA America
New Zealand,NZ Aotearoa
Guinea-Bissau,Guinea-Bissau
Guinea,Conakry
Peru,PE
";

fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn config(dir: &Path, corpus: &[u8], workers: usize, max_chunk_rows: usize) -> ScanConfig {
    ScanConfig {
        countries_path: write_file(dir, "countries.csv", COUNTRIES.as_bytes()),
        corpus_path: write_file(dir, "corpus.csv", corpus),
        output_path: dir.join("processed").join("country_mentions.csv"),
        workers: Some(workers),
        max_chunk_rows,
        alias_filter: AliasFilter::default(),
    }
}

fn read_output(path: &Path) -> Result<Vec<MatchRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        records.push(result?);
    }
    records.sort_by_key(|r: &MatchRecord| r.row_num);
    Ok(records)
}

fn sample_corpus() -> String {
    [
        "title,abstract,journal,date,doi",
        "Study on US policy,No mention here,J1,2020,10.1/a",
        "Coastal ecology,Findings from New Zealand's ecosystem,J2,2021,10.1/b",
        "Rice in Guinea-Bissau,Compared with Conakry markets,J3,2019,10.1/c",
        "Too short,row",
        "Andean soils,\"Samples from PERU,\nincluding the highlands\",J4,2018,10.1/d",
        "Trade with America,Exports from the USA and Aotearoa,J5,2022,10.1/e",
        "Nothing,Nowhere,J6,2017,10.1/f",
    ]
    .join("\n")
        + "\n"
}

#[test]
fn scan_writes_only_rows_with_mentions() -> Result<()> {
    let dir = TempDir::new()?;
    let cfg = config(dir.path(), sample_corpus().as_bytes(), 2, 10_000);

    let report = pipeline::run_scan(&cfg)?;
    assert!(report.is_complete());
    assert_eq!(report.countries, 5);
    assert_eq!(report.plan.rows, 7);
    assert_eq!(report.mentions_written, 4);

    let records = read_output(&cfg.output_path)?;
    let row_nums: Vec<usize> = records.iter().map(|r| r.row_num).collect();
    assert_eq!(row_nums, vec![2, 3, 5, 6]);

    assert_eq!(records[0].title_country, "");
    assert_eq!(records[0].abstract_country, "New Zealand");
    assert_eq!(records[0].journal, "J2");
    assert_eq!(records[0].date, "2021");

    // Countries are matched independently: "Guinea" is still a whole word
    // inside "Guinea-Bissau".
    assert_eq!(records[1].title_country, "Guinea-Bissau, Guinea");
    assert_eq!(records[1].abstract_country, "Guinea");

    assert_eq!(records[2].title_country, "");
    assert_eq!(records[2].abstract_country, "Peru");
    assert_eq!(
        records[2].abstract_text,
        "Samples from PERU,\nincluding the highlands"
    );

    assert_eq!(records[3].title_country, "United States");
    assert_eq!(records[3].abstract_country, "United States, New Zealand");
    Ok(())
}

#[test]
fn output_header_is_fixed() -> Result<()> {
    let dir = TempDir::new()?;
    let cfg = config(dir.path(), sample_corpus().as_bytes(), 1, 10_000);
    pipeline::run_scan(&cfg)?;

    let content = fs::read_to_string(&cfg.output_path)?;
    assert_eq!(
        content.lines().next(),
        Some("row_num,title,abstract,journal,date,title_country,abstract_country")
    );
    Ok(())
}

#[test]
fn results_do_not_depend_on_chunking() -> Result<()> {
    let mut outputs = Vec::new();
    for (workers, max_rows) in [(1, 10_000), (3, 1), (2, 2), (4, 3)] {
        let dir = TempDir::new()?;
        let cfg = config(dir.path(), sample_corpus().as_bytes(), workers, max_rows);
        pipeline::run_scan(&cfg)?;
        outputs.push(read_output(&cfg.output_path)?);
    }
    for output in &outputs[1..] {
        assert_eq!(output, &outputs[0]);
    }
    Ok(())
}

#[test]
fn three_rows_in_chunks_of_two() -> Result<()> {
    let dir = TempDir::new()?;
    let corpus = "title,abstract,journal,date\nPeru one,a,J,1\nPeru two,a,J,2\nPeru three,a,J,3\n";
    let cfg = config(dir.path(), corpus.as_bytes(), 2, 2);

    let report = pipeline::run_scan(&cfg)?;
    assert_eq!(report.plan.chunk_size, 2);
    assert_eq!(report.plan.num_chunks, 2);

    let records = read_output(&cfg.output_path)?;
    let titles: Vec<(usize, &str)> = records
        .iter()
        .map(|r| (r.row_num, r.title.as_str()))
        .collect();
    assert_eq!(
        titles,
        vec![(1, "Peru one"), (2, "Peru two"), (3, "Peru three")]
    );
    Ok(())
}

#[test]
fn failed_chunk_is_reported_and_isolated() -> Result<()> {
    let dir = TempDir::new()?;
    let mut corpus = b"title,abstract,journal,date\n".to_vec();
    corpus.extend_from_slice(b"Peru 1,a,J,D\nPeru 2,a,J,D\n");
    corpus.extend_from_slice(b"Peru 3,bad \xff bytes,J,D\nPeru 4,a,J,D\n");
    corpus.extend_from_slice(b"Peru 5,a,J,D\n");
    let cfg = config(dir.path(), &corpus, 2, 2);

    let report: ScanReport = pipeline::run_scan(&cfg)?;
    assert!(!report.is_complete());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.lost_rows(), 2);

    let failure = &report.failures[0];
    assert_eq!(failure.index, 1);
    assert_eq!(failure.start_row, 3);
    assert_eq!(
        failure.error,
        ScanError::InvalidUtf8 {
            row_num: 3,
            field: "abstract"
        }
    );
    assert_eq!(report.stats.failed(), 1);
    assert_eq!(report.stats.completed(), 2);

    let row_nums: Vec<usize> = read_output(&cfg.output_path)?
        .iter()
        .map(|r| r.row_num)
        .collect();
    assert_eq!(row_nums, vec![1, 2, 5]);
    Ok(())
}

#[test]
fn blank_lines_keep_their_row_number() -> Result<()> {
    let dir = TempDir::new()?;
    let cfg = config(dir.path(), b"h\nPeru,a,J,D\n\nPeru,b,J,D\n", 1, 10_000);

    let report = pipeline::run_scan(&cfg)?;
    assert_eq!(report.plan.rows, 3);

    let records = read_output(&cfg.output_path)?;
    let rows: Vec<(usize, &str)> = records
        .iter()
        .map(|r| (r.row_num, r.abstract_text.as_str()))
        .collect();
    assert_eq!(rows, vec![(1, "a"), (3, "b")]);
    Ok(())
}

#[test]
fn empty_corpus_writes_header_only() -> Result<()> {
    let dir = TempDir::new()?;
    let cfg = config(dir.path(), b"title,abstract,journal,date\n", 4, 10_000);

    let report = pipeline::run_scan(&cfg)?;
    assert!(report.is_complete());
    assert_eq!(report.plan.num_chunks, 0);
    assert!(read_output(&cfg.output_path)?.is_empty());
    Ok(())
}

#[test]
fn missing_gazetteer_aborts_without_output() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(dir.path(), sample_corpus().as_bytes(), 1, 10_000);
    cfg.countries_path = dir.path().join("missing.csv");

    assert!(pipeline::run_scan(&cfg).is_err());
    assert!(!cfg.output_path.exists());
}

#[test]
fn missing_corpus_aborts_without_output() {
    let dir = TempDir::new().unwrap();
    let mut cfg = config(dir.path(), sample_corpus().as_bytes(), 1, 10_000);
    cfg.corpus_path = dir.path().join("missing.csv");

    assert!(pipeline::run_scan(&cfg).is_err());
    assert!(!cfg.output_path.exists());
}

#[test]
fn custom_stop_words_change_matching() -> Result<()> {
    let dir = TempDir::new()?;
    let mut cfg = config(dir.path(), sample_corpus().as_bytes(), 1, 10_000);
    cfg.alias_filter = AliasFilter::new(["america", "usa"], 3);
    pipeline::run_scan(&cfg)?;

    let records = read_output(&cfg.output_path)?;
    let row6 = records.iter().find(|r| r.row_num == 6).unwrap();
    assert_eq!(row6.title_country, "");
    assert_eq!(row6.abstract_country, "New Zealand");
    Ok(())
}
