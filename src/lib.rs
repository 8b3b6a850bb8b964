//! Country Mentions: gazetteer-driven country tagging for abstract corpora
//!
//! This crate scans a CSV corpus of scientific abstracts for mentions of
//! countries and writes an annotated extract. It runs as two independent
//! stages:
//!
//! 1. **Scan** -- Load a gazetteer of country names and aliases, compile one
//!    whole-word, case-insensitive pattern per country, split the corpus into
//!    row chunks and scan them in parallel; every row mentioning a country in
//!    its title or abstract is written to an unsorted CSV in chunk completion
//!    order
//! 2. **Sort** -- Reorder the unsorted CSV by original row number
//!
//! # Architecture
//!
//! - **Explicit configuration** -- Stop words, minimum alias length and file
//!   locations are values passed into each stage
//! - **Longest alias first** -- Multi-word aliases are tried before shorter
//!   aliases that start at the same position
//! - **Parallel scan** -- A rayon pool scans chunks; the compiled patterns are
//!   shared read-only and each chunk owns its rows
//! - **Per-chunk failure isolation** -- A chunk that fails (invalid UTF-8 or a
//!   worker panic) is reported with its cause and starting row; other chunks
//!   still complete and the run is marked incomplete
//!
//! # Key Modules
//!
//! - [`gazetteer`] -- Country name and alias loading with noise filtering
//! - [`patterns`] -- Per-country alias matchers
//! - [`scanner`] -- Chunk scanning and the per-chunk error type
//! - [`corpus`] -- Corpus reader that keeps blank lines as (short) rows
//! - [`pipeline`] -- Chunk planning, worker fan-out/fan-in, unsorted output
//! - [`sort`] -- Stable reordering by row number
//! - [`models`] -- Core data types (CountryEntry, Chunk, MatchRecord)
//! - [`stats`] -- Thread-safe atomic counters for scan metrics
//! - [`config`] -- Constants and stage configuration
//!
//! # Example Usage
//!
//! ```bash
//! # Scan with the default data/ layout
//! country-mentions scan
//!
//! # Sort the unsorted extract by row number
//! country-mentions sort
//! ```

pub mod config;
pub mod corpus;
pub mod gazetteer;
pub mod models;
pub mod patterns;
pub mod pipeline;
pub mod scanner;
pub mod sort;
pub mod stats;
