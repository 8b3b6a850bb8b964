use crate::gazetteer::Gazetteer;
use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use std::cmp::Reverse;
use tracing::debug;

/// A case-insensitive whole-word matcher for every alias of one country.
#[derive(Debug, Clone)]
pub struct CountryPattern {
    name: String,
    regex: Regex,
}

impl CountryPattern {
    pub fn compile(name: &str, aliases: &[String]) -> Result<Self> {
        let regex = RegexBuilder::new(&alias_pattern(aliases))
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Failed to compile pattern for {}", name))?;
        Ok(Self {
            name: name.to_string(),
            regex,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Text of the leftmost alias match, if any
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

/// Builds `\b(?:a|b|c)\b` with aliases longest first, so that at any text
/// position a multi-word alias wins over a shorter alias it starts with.
pub fn alias_pattern(aliases: &[String]) -> String {
    let mut sorted: Vec<&str> = aliases.iter().map(String::as_str).collect();
    sorted.sort_by_key(|alias| Reverse(alias.chars().count()));

    let alternation = sorted
        .iter()
        .map(|alias| regex::escape(alias))
        .collect::<Vec<_>>()
        .join("|");
    format!(r"\b(?:{})\b", alternation)
}

/// Compiled matchers in gazetteer order.
#[derive(Debug, Clone, Default)]
pub struct CountryPatterns {
    patterns: Vec<CountryPattern>,
}

impl CountryPatterns {
    pub fn compile(gazetteer: &Gazetteer) -> Result<Self> {
        let patterns = gazetteer
            .iter()
            .map(|entry| CountryPattern::compile(&entry.name, &entry.aliases))
            .collect::<Result<Vec<_>>>()?;
        debug!(patterns = patterns.len(), "Country patterns compiled");
        Ok(Self { patterns })
    }

    /// Names of every country whose pattern matches somewhere in `text`,
    /// in gazetteer order.
    pub fn countries_in<'a>(&'a self, text: &str) -> Vec<&'a str> {
        if text.is_empty() {
            return Vec::new();
        }
        self.patterns
            .iter()
            .filter(|p| p.is_match(text))
            .map(CountryPattern::name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
