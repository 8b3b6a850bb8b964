use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use country_mentions::config::{self, AliasFilter, ScanConfig};
use country_mentions::pipeline::{self, ScanReport};
use country_mentions::sort;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Exit code for a scan that finished but lost one or more chunks
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser)]
#[command(name = "country-mentions")]
#[command(about = "Tag scientific abstracts with the countries they mention")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the corpus and write rows that mention a country (unsorted)
    Scan(ScanArgs),
    /// Sort a mentions table by row number
    Sort(SortArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Gazetteer CSV: country name, whitespace-separated aliases
    #[arg(long, default_value = config::DEFAULT_COUNTRIES_PATH)]
    countries: PathBuf,

    /// Corpus CSV: title, abstract, journal, date, ...
    #[arg(short, long, default_value = config::DEFAULT_CORPUS_PATH)]
    input: PathBuf,

    /// Unsorted output CSV
    #[arg(short, long, default_value = config::DEFAULT_UNSORTED_PATH)]
    output: PathBuf,

    /// Worker threads (default: available parallelism minus one)
    #[arg(long)]
    workers: Option<usize>,

    /// Maximum rows per chunk
    #[arg(long, default_value_t = config::MAX_CHUNK_ROWS)]
    max_chunk_rows: usize,

    /// Aliases shorter than this many characters are ignored
    #[arg(long, default_value_t = config::MIN_ALIAS_LEN)]
    min_alias_len: usize,

    /// Alias to ignore, repeatable (replaces the built-in stop words)
    #[arg(long = "stop-word")]
    stop_words: Vec<String>,

    /// Exit successfully even if some chunks failed
    #[arg(long)]
    allow_partial: bool,
}

#[derive(Args)]
struct SortArgs {
    /// Unsorted mentions CSV
    #[arg(short, long, default_value = config::DEFAULT_UNSORTED_PATH)]
    input: PathBuf,

    /// Sorted output CSV
    #[arg(short, long, default_value = config::DEFAULT_SORTED_PATH)]
    output: PathBuf,
}

fn run_scan(args: ScanArgs) -> Result<ExitCode> {
    let alias_filter = if args.stop_words.is_empty() {
        AliasFilter::new(config::DEFAULT_STOP_WORDS.iter().copied(), args.min_alias_len)
    } else {
        AliasFilter::new(&args.stop_words, args.min_alias_len)
    };

    let scan_config = ScanConfig {
        countries_path: args.countries,
        corpus_path: args.input,
        output_path: args.output,
        workers: args.workers,
        max_chunk_rows: args.max_chunk_rows.max(1),
        alias_filter,
    };

    let start = Instant::now();
    let report = pipeline::run_scan(&scan_config)?;
    print_summary(&report, start.elapsed());

    if report.is_complete() {
        Ok(ExitCode::SUCCESS)
    } else if args.allow_partial {
        warn!(
            failed_chunks = report.failures.len(),
            "Scan incomplete, continuing because --allow-partial was given"
        );
        Ok(ExitCode::SUCCESS)
    } else {
        error!(
            failed_chunks = report.failures.len(),
            lost_rows = report.lost_rows(),
            "Scan incomplete"
        );
        Ok(ExitCode::from(EXIT_PARTIAL))
    }
}

fn print_summary(report: &ScanReport, elapsed: Duration) {
    let stats = &report.stats;

    println!();
    println!("=== Summary ===");
    println!("Total time:         {:.2}s", elapsed.as_secs_f64());
    println!();
    println!("Countries loaded:   {}", report.countries);
    println!("Rows in corpus:     {}", report.plan.rows);
    println!("Workers:            {}", report.plan.workers);
    println!("Chunk size:         {}", report.plan.chunk_size);
    println!("Chunks completed:   {}", stats.completed());
    println!("Chunks failed:      {}", stats.failed());
    println!("Rows scanned:       {}", stats.rows());
    println!("Mentions written:   {}", report.mentions_written);
    println!("Title mentions:     {}", stats.title_hits());
    println!("Abstract mentions:  {}", stats.abstract_hits());

    if !report.is_complete() {
        println!();
        println!(
            "INCOMPLETE: {} chunk(s) failed, {} row(s) missing from output",
            report.failures.len(),
            report.lost_rows()
        );
        for failure in &report.failures {
            println!(
                "  chunk {} (rows {}-{}): {}",
                failure.index,
                failure.start_row,
                failure.end_row().unwrap_or(failure.start_row),
                failure.error
            );
        }
    }
}

fn run_sort(args: SortArgs) -> Result<ExitCode> {
    let rows = sort::sort_mentions(&args.input, &args.output)?;
    println!("Done! Sorted data saved to {}", args.output.display());
    println!("Total entries: {}", rows);
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Sort(args) => run_sort(args),
    };

    match result {
        Ok(code) => {
            info!("Completed");
            code
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
