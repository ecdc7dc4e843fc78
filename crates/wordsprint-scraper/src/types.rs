//! Core data types for scraped vocabulary units.

use std::fmt;

use crate::error::{ScrapeError, ScrapeResult};

/// A numbered page of vocabulary on the learning site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u32);

impl UnitId {
    /// Create a unit identifier. Units are numbered from 1.
    pub fn new(n: u32) -> ScrapeResult<Self> {
        if n == 0 {
            return Err(ScrapeError::InvalidConfig(
                "unit numbers start at 1".to_string(),
            ));
        }
        Ok(Self(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Output file name for this unit, e.g. `unit_3.json`.
    pub fn file_name(self) -> String {
        format!("unit_{}.json", self.0)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One term and its meaning, as read from a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordEntry {
    pub term: String,
    pub meaning: String,
}

impl WordEntry {
    /// Build an entry from raw card text, trimming surrounding whitespace.
    pub fn from_raw(term: &str, meaning: &str) -> Self {
        Self {
            term: term.trim().to_string(),
            meaning: meaning.trim().to_string(),
        }
    }
}

/// The term → meaning mapping extracted from one unit.
///
/// Entries keep the position of their first appearance; inserting an
/// existing term replaces its meaning in place.
#[derive(Debug, Clone)]
pub struct UnitDocument {
    pub unit: UnitId,
    entries: serde_json::Map<String, serde_json::Value>,
}

impl UnitDocument {
    pub fn new(unit: UnitId) -> Self {
        Self {
            unit,
            entries: serde_json::Map::new(),
        }
    }

    /// Record an entry. Returns the meaning it replaced, if any.
    pub fn insert(&mut self, entry: WordEntry) -> Option<String> {
        self.entries
            .insert(entry.term, serde_json::Value::String(entry.meaning))
            .and_then(|v| match v {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
    }

    pub fn get(&self, term: &str) -> Option<&str> {
        self.entries.get(term).and_then(|v| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|m| (k.as_str(), m)))
    }

    /// The JSON object written to disk.
    pub fn as_json(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.entries
    }
}
