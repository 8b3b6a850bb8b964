use rustc_hash::FxHashSet;
use std::path::PathBuf;

/// Upper bound on rows per chunk, bounding per-worker memory
pub const MAX_CHUNK_ROWS: usize = 10_000;

/// Aliases shorter than this many characters are dropped (2-letter codes and the like)
pub const MIN_ALIAS_LEN: usize = 3;

/// Directional and prepositional tokens that appear inside multi-word country
/// names and would otherwise match almost every abstract
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "of", "the", "in", "on", "at", "by", "with", "to", "from", "for", "new", "east", "west",
    "north", "south", "central",
];

/// Separator used when joining the countries found in one field
pub const COUNTRY_SEPARATOR: &str = ", ";

/// Input rows must carry at least title, abstract, journal and date
pub const MIN_CORPUS_FIELDS: usize = 4;

/// Gazetteer rows must carry at least a name and an alias list
pub const MIN_GAZETTEER_FIELDS: usize = 2;

pub const DEFAULT_COUNTRIES_PATH: &str = "data/raw/countries.csv";
pub const DEFAULT_CORPUS_PATH: &str = "data/raw/abstract_1per_sample.csv";
pub const DEFAULT_UNSORTED_PATH: &str = "data/processed/country_mentions.csv";
pub const DEFAULT_SORTED_PATH: &str = "data/processed/country_mentions_sorted.csv";

/// Column header of both output tables
pub const OUTPUT_HEADER: [&str; 7] = [
    "row_num",
    "title",
    "abstract",
    "journal",
    "date",
    "title_country",
    "abstract_country",
];

/// Column the sorter orders by
pub const ROW_NUM_COLUMN: &str = "row_num";

/// Decides which gazetteer aliases are kept for matching.
#[derive(Debug, Clone)]
pub struct AliasFilter {
    /// Lowercased tokens that are never used as aliases
    stop_words: FxHashSet<String>,
    min_len: usize,
}

impl AliasFilter {
    pub fn new<I, S>(stop_words: I, min_len: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            stop_words: stop_words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
            min_len,
        }
    }

    /// Returns true if `alias` is long enough and not a stop word.
    pub fn accepts(&self, alias: &str) -> bool {
        alias.chars().count() >= self.min_len && !self.stop_words.contains(&alias.to_lowercase())
    }

    pub fn is_stop_word(&self, alias: &str) -> bool {
        self.stop_words.contains(&alias.to_lowercase())
    }
}

impl Default for AliasFilter {
    fn default() -> Self {
        Self::new(DEFAULT_STOP_WORDS.iter().copied(), MIN_ALIAS_LEN)
    }
}

/// Everything the scan stage needs, passed in explicitly.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub countries_path: PathBuf,
    pub corpus_path: PathBuf,
    pub output_path: PathBuf,
    /// Overrides the worker count derived from available parallelism
    pub workers: Option<usize>,
    pub max_chunk_rows: usize,
    pub alias_filter: AliasFilter,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            countries_path: PathBuf::from(DEFAULT_COUNTRIES_PATH),
            corpus_path: PathBuf::from(DEFAULT_CORPUS_PATH),
            output_path: PathBuf::from(DEFAULT_UNSORTED_PATH),
            workers: None,
            max_chunk_rows: MAX_CHUNK_ROWS,
            alias_filter: AliasFilter::default(),
        }
    }
}
