use crate::config::{AliasFilter, MIN_GAZETTEER_FIELDS};
use crate::models::CountryEntry;
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rustc_hash::FxHashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Canonical country names and their matchable aliases, in load order.
#[derive(Debug, Default, Clone)]
pub struct Gazetteer {
    entries: Vec<CountryEntry>,
    positions: FxHashMap<String, usize>,
}

impl Gazetteer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a `country_name,alias_list` table. The header row is skipped and
    /// rows with fewer than two fields are ignored.
    pub fn load(path: &Path, filter: &AliasFilter) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open gazetteer: {}", path.display()))?;
        let gazetteer = Self::from_reader(file, filter)
            .with_context(|| format!("Failed to read gazetteer: {}", path.display()))?;

        info!(
            path = %path.display(),
            countries = gazetteer.len(),
            "Gazetteer loaded"
        );
        Ok(gazetteer)
    }

    pub fn from_reader<R: Read>(reader: R, filter: &AliasFilter) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut gazetteer = Self::new();
        for result in reader.records() {
            let record = result?;
            if record.len() < MIN_GAZETTEER_FIELDS {
                continue;
            }
            gazetteer.insert(&record[0], &record[1], filter);
        }
        Ok(gazetteer)
    }

    /// Adds one gazetteer row. A repeated name replaces the earlier aliases but
    /// keeps its original position. Returns false if nothing survived filtering.
    pub fn insert(&mut self, name: &str, alias_list: &str, filter: &AliasFilter) -> bool {
        let name = name.trim();
        let aliases = filter_aliases(name, alias_list, filter);
        if aliases.is_empty() {
            debug!(country = name, "No usable aliases, skipping");
            return false;
        }

        match self.positions.get(name) {
            Some(&pos) => self.entries[pos].aliases = aliases,
            None => {
                self.positions.insert(name.to_string(), self.entries.len());
                self.entries.push(CountryEntry {
                    name: name.to_string(),
                    aliases,
                });
            }
        }
        true
    }

    pub fn get(&self, name: &str) -> Option<&CountryEntry> {
        self.positions.get(name).map(|&pos| &self.entries[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &CountryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits a whitespace-separated alias list, drops short and stop-word tokens,
/// then appends the canonical name, which bypasses the filter.
pub fn filter_aliases(name: &str, alias_list: &str, filter: &AliasFilter) -> Vec<String> {
    let name = name.trim();
    if name.is_empty() {
        return Vec::new();
    }

    let mut aliases: Vec<String> = alias_list
        .split_whitespace()
        .filter(|alias| filter.accepts(alias))
        .map(str::to_string)
        .collect();
    aliases.push(name.to_string());
    aliases
}
