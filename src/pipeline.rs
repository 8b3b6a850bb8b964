use crate::config::{ScanConfig, OUTPUT_HEADER};
use crate::corpus;
use crate::gazetteer::Gazetteer;
use crate::models::{last_row, Chunk, MatchRecord};
use crate::patterns::CountryPatterns;
use crate::scanner::{self, ChunkOutcome, ScanError};
use crate::stats::ScanStats;
use anyhow::{Context, Result};
use csv::{ByteRecord, WriterBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::ThreadPoolBuilder;
use std::any::Any;
use std::fs::{self, File};
use std::io::BufWriter;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Worker count and chunk geometry derived from the corpus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub rows: usize,
    pub workers: usize,
    pub chunk_size: usize,
    pub num_chunks: usize,
}

impl ChunkPlan {
    /// Chunks are `ceil(rows / workers)` rows, capped at `max_chunk_rows`.
    pub fn new(rows: usize, workers: usize, max_chunk_rows: usize) -> Self {
        let workers = workers.max(1);
        let chunk_size = rows.div_ceil(workers).min(max_chunk_rows).max(1);
        Self {
            rows,
            workers,
            chunk_size,
            num_chunks: rows.div_ceil(chunk_size),
        }
    }

    /// 1-based row number of the first row in chunk `index`
    pub fn start_row(&self, index: usize) -> usize {
        index * self.chunk_size + 1
    }
}

/// Available parallelism minus one unit for the controlling thread, at least 1
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// A chunk whose rows are missing from the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub index: usize,
    pub start_row: usize,
    pub rows: usize,
    pub error: ScanError,
}

impl ChunkFailure {
    /// Row number of the last lost row
    pub fn end_row(&self) -> Option<usize> {
        last_row(self.start_row, self.rows)
    }
}

/// Everything gathered from the workers, in completion order.
#[derive(Debug, Default)]
pub struct CollectedChunks {
    pub records: Vec<MatchRecord>,
    pub failures: Vec<ChunkFailure>,
    /// Chunk indices in the order their results arrived
    pub completion_order: Vec<usize>,
}

impl CollectedChunks {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a full scan run
#[derive(Debug)]
pub struct ScanReport {
    pub countries: usize,
    pub plan: ChunkPlan,
    pub mentions_written: usize,
    pub failures: Vec<ChunkFailure>,
    pub stats: Arc<ScanStats>,
}

impl ScanReport {
    /// False when any chunk failed and its rows are absent from the output
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn lost_rows(&self) -> usize {
        self.failures.iter().map(|f| f.rows).sum()
    }
}

/// Counts data rows (header excluded) in a CSV file, blank lines included
pub fn count_rows(path: &Path) -> Result<usize> {
    let mut reader = corpus::open(path)?;

    let pb = make_spinner("Counting rows");
    let mut record = ByteRecord::new();
    let mut count = 0usize;
    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("Failed to read corpus: {}", path.display()))?
    {
        count += 1;
        if count % 10_000 == 0 {
            pb.set_message(format!("Counting rows: {count}"));
        }
    }
    pb.finish_and_clear();

    Ok(count)
}

/// Splits rows into consecutive chunks of `chunk_size` (the last may be shorter).
pub fn split_into_chunks<I>(rows: I, chunk_size: usize) -> Vec<Chunk>
where
    I: IntoIterator<Item = ByteRecord>,
{
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut current = Vec::with_capacity(chunk_size);

    for row in rows {
        current.push(row);
        if current.len() >= chunk_size {
            let index = chunks.len();
            chunks.push(Chunk::new(
                index,
                index * chunk_size + 1,
                std::mem::replace(&mut current, Vec::with_capacity(chunk_size)),
            ));
        }
    }
    if !current.is_empty() {
        let index = chunks.len();
        chunks.push(Chunk::new(index, index * chunk_size + 1, current));
    }
    chunks
}

/// Reads the whole corpus into memory as chunks
pub fn read_chunks(path: &Path, chunk_size: usize) -> Result<Vec<Chunk>> {
    let mut reader = corpus::open(path)?;

    let mut rows = Vec::new();
    for result in reader.byte_records() {
        rows.push(result.with_context(|| format!("Failed to read corpus: {}", path.display()))?);
    }
    Ok(split_into_chunks(rows, chunk_size))
}

/// Scans chunks against `patterns` on a pool of `workers` threads.
pub fn scan_chunks(
    chunks: Vec<Chunk>,
    patterns: Arc<CountryPatterns>,
    workers: usize,
    stats: Arc<ScanStats>,
) -> Result<CollectedChunks> {
    scan_chunks_with(chunks, workers, stats, move |chunk| {
        scanner::scan_chunk(chunk, &patterns)
    })
}

/// Runs `scan` over every chunk on a dedicated pool and gathers results in
/// completion order. A chunk that errors or panics is recorded as a failure;
/// the remaining chunks are unaffected.
pub fn scan_chunks_with<F>(
    chunks: Vec<Chunk>,
    workers: usize,
    stats: Arc<ScanStats>,
    scan: F,
) -> Result<CollectedChunks>
where
    F: Fn(&Chunk) -> ChunkOutcome + Send + Sync + 'static,
{
    let total = chunks.len();
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("country-mentions-scan-{i}"))
        .build()
        .context("Failed to build worker pool")?;

    let scan = Arc::new(scan);
    let (tx, rx) = mpsc::channel();

    for chunk in chunks {
        let tx = tx.clone();
        let scan = Arc::clone(&scan);
        let stats = Arc::clone(&stats);
        pool.spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (*scan)(&chunk))).unwrap_or_else(
                |payload| {
                    Err(ScanError::Panicked {
                        message: panic_message(payload.as_ref()),
                    })
                },
            );
            match &outcome {
                Ok(records) => stats.record_chunk(chunk.len(), records),
                Err(_) => stats.inc_failed(),
            }
            // Receiver lives until every sender is dropped
            let _ = tx.send((chunk.index, chunk.start_row, chunk.len(), outcome));
        });
    }
    drop(tx);

    let pb = make_progress_bar(total as u64);
    let mut collected = CollectedChunks::default();

    for (index, start_row, rows, outcome) in rx {
        collected.completion_order.push(index);
        match outcome {
            Ok(records) => {
                let found = records.len();
                collected.records.extend(records);
                info!(
                    chunk = index + 1,
                    total,
                    found,
                    running_total = collected.records.len(),
                    "Chunk complete"
                );
            }
            Err(e) => {
                error!(chunk = index, start_row, rows, error = %e, "Chunk failed");
                collected.failures.push(ChunkFailure {
                    index,
                    start_row,
                    rows,
                    error: e,
                });
            }
        }
        pb.inc(1);
    }

    pb.finish_with_message(format!(
        "{} chunks scanned, {} failed",
        total - collected.failures.len(),
        collected.failures.len()
    ));
    collected.failures.sort_by_key(|f| f.index);

    Ok(collected)
}

/// Writes match records with the fixed output header, in the given order.
pub fn write_mentions(path: &Path, records: &[MatchRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let file = File::create(path)
        .with_context(|| format!("Failed to create output: {}", path.display()))?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::with_capacity(128 * 1024, file));

    writer.write_record(OUTPUT_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    debug!(path = %path.display(), rows = records.len(), "Mentions written");
    Ok(())
}

/// Load, compile, count, chunk, scan in parallel, and write the unsorted table.
pub fn run_scan(config: &ScanConfig) -> Result<ScanReport> {
    println!("Loading country data...");
    let gazetteer = Gazetteer::load(&config.countries_path, &config.alias_filter)?;
    println!("Loaded {} countries with variations.", gazetteer.len());

    println!("Compiling regex patterns...");
    let patterns = Arc::new(CountryPatterns::compile(&gazetteer)?);
    let countries = patterns.len();
    if patterns.is_empty() {
        warn!(path = %config.countries_path.display(), "No country patterns, nothing can match");
    }

    println!("Counting rows in {}...", config.corpus_path.display());
    let row_count = count_rows(&config.corpus_path)?;
    println!("Found {} rows to process.", row_count);

    let workers = config.workers.unwrap_or_else(default_workers);
    let plan = ChunkPlan::new(row_count, workers, config.max_chunk_rows);
    println!(
        "Processing with {} workers in {} chunks of ~{} rows each",
        plan.workers, plan.num_chunks, plan.chunk_size
    );

    println!("Reading data and submitting tasks...");
    let chunks = read_chunks(&config.corpus_path, plan.chunk_size)?;
    info!(chunks = chunks.len(), "Corpus chunked");

    let stats = Arc::new(ScanStats::new());
    let collected = scan_chunks(chunks, patterns, plan.workers, Arc::clone(&stats))?;

    println!("Writing results to {}...", config.output_path.display());
    write_mentions(&config.output_path, &collected.records)?;
    println!(
        "Created CSV with {} entries containing country mentions.",
        collected.records.len()
    );

    Ok(ScanReport {
        countries,
        plan,
        mentions_written: collected.records.len(),
        failures: collected.failures,
        stats,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn make_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(msg.to_string());
    pb
}

fn make_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} Processing chunks [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("=> "),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
