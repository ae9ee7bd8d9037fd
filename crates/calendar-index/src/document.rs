//! Documents as handed over by the host, and lenient readers for their
//! metadata.
//!
//! Metadata is user-authored, so every reader returns "absent" rather than an
//! error when a value has the wrong shape.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::date_key::{parse_date_time, DateKey};
use crate::error::{IndexError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub path: String,
    /// File name without extension; derived from `path` when blank.
    #[serde(default)]
    pub basename: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let basename = basename_of(&path);
        Self {
            path,
            basename,
            metadata: Map::new(),
        }
    }

    /// Builder used mostly by tests and fixtures.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn display_name(&self) -> &str {
        if self.basename.is_empty() {
            &self.path
        } else {
            &self.basename
        }
    }

    /// A non-empty string value. Numbers are rendered as text.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn date(&self, key: &str) -> Option<DateKey> {
        match self.metadata.get(key)? {
            Value::String(s) => DateKey::from_metadata(s),
            _ => None,
        }
    }

    pub fn date_time(&self, key: &str) -> Option<NaiveDateTime> {
        match self.metadata.get(key)? {
            Value::String(s) => parse_date_time(s),
            _ => None,
        }
    }

    /// A non-negative whole number of minutes, given as a number or numeric string.
    pub fn minutes(&self, key: &str) -> Option<u32> {
        match self.metadata.get(key)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
                .and_then(|m| u32::try_from(m).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A list of strings. A single string is split on commas.
    pub fn list(&self, key: &str) -> Vec<String> {
        let items: Vec<String> = match self.metadata.get(key) {
            Some(Value::Array(values)) => values
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Every parseable date in a list field; unparseable entries are skipped.
    pub fn dates(&self, key: &str) -> Vec<DateKey> {
        self.list(key)
            .iter()
            .filter_map(|s| DateKey::from_metadata(s))
            .collect()
    }

    /// Union of `tags` and `tag`, without leading `#`.
    pub fn tags(&self) -> BTreeSet<String> {
        self.list("tags")
            .into_iter()
            .chain(self.list("tag"))
            .flat_map(|s| {
                s.split_whitespace()
                    .map(|t| t.trim_start_matches('#').to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Case-insensitive tag test; a leading `#` on `tag` is ignored.
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim_start_matches('#');
        self.tags().iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

fn basename_of(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// The host's document store, as seen by a full rebuild.
pub trait DocumentSource {
    fn documents(&self) -> Vec<Document>;
}

/// A document set held in memory, e.g. loaded from a JSON snapshot.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    docs: Vec<Document>,
}

impl InMemorySource {
    pub fn new(docs: Vec<Document>) -> Self {
        let mut source = Self::default();
        for doc in docs {
            source.upsert(doc);
        }
        source
    }

    /// Load a JSON array of documents.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Source`] when the JSON is malformed or a
    /// document has an empty path.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let docs: Vec<Document> =
            serde_json::from_str(json).map_err(|e| IndexError::Source(e.to_string()))?;
        let mut source = Self::default();
        for mut doc in docs {
            if doc.path.trim().is_empty() {
                return Err(IndexError::Source("document with empty path".to_string()));
            }
            if doc.basename.is_empty() {
                doc.basename = basename_of(&doc.path);
            }
            source.upsert(doc);
        }
        Ok(source)
    }

    /// Insert or replace the document at `doc.path`.
    pub fn upsert(&mut self, doc: Document) {
        match self.docs.iter_mut().find(|d| d.path == doc.path) {
            Some(existing) => *existing = doc,
            None => self.docs.push(doc),
        }
    }

    pub fn remove(&mut self, path: &str) -> Option<Document> {
        let pos = self.docs.iter().position(|d| d.path == path)?;
        Some(self.docs.remove(pos))
    }

    pub fn get(&self, path: &str) -> Option<&Document> {
        self.docs.iter().find(|d| d.path == path)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl DocumentSource for InMemorySource {
    fn documents(&self) -> Vec<Document> {
        self.docs.clone()
    }
}
