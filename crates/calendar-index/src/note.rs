//! Point notes and per-date aggregate status.
//!
//! The manager owns three tables: notes per date, the derived [`DateStatus`]
//! per date, and a reverse index from file path to the dates it touched.
//! Daily-note dates are tracked separately so that a date with a daily note
//! keeps its status entry after every other note on it is removed.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::date_key::DateKey;
use crate::task::TaskAxis;

/// Where a note on a date came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "source", rename_all = "snake_case")]
pub enum NoteKind {
    /// The document's own `date` field.
    Dated,
    /// A configured custom date property, by name.
    Property(String),
    /// An occurrence generated from a recurrence rule.
    Recurring,
    /// An indicator synthesized for a task's scheduled/due/completed date.
    TaskMarker(TaskAxis),
}

/// A point-date annotation contributed by one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteRecord {
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub tags: BTreeSet<String>,
    pub recurring: bool,
    pub kind: NoteKind,
}

impl NoteRecord {
    pub fn new(path: impl Into<String>, name: impl Into<String>, kind: NoteKind) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            color: None,
            symbol: None,
            tags: BTreeSet::new(),
            recurring: matches!(kind, NoteKind::Recurring),
            kind,
        }
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }

    pub fn with_symbol(mut self, symbol: Option<String>) -> Self {
        self.symbol = symbol;
        self
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn recurring(mut self, recurring: bool) -> Self {
        self.recurring = recurring;
        self
    }
}

/// Aggregate metadata for one date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateStatus {
    pub has_daily_note: bool,
    pub note_count: usize,
    /// Union of the tags of every note on the date.
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct NoteManager {
    notes: HashMap<DateKey, Vec<NoteRecord>>,
    status: HashMap<DateKey, DateStatus>,
    /// Every document that resolves to the daily note of a date.
    daily_notes: HashMap<DateKey, BTreeSet<String>>,
    by_file: HashMap<String, BTreeSet<DateKey>>,
}

impl NoteManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_note(&mut self, date: DateKey, note: NoteRecord) {
        let status = self.status.entry(date).or_default();
        status.tags.extend(note.tags.iter().cloned());
        status.note_count += 1;

        self.by_file
            .entry(note.path.clone())
            .or_default()
            .insert(date);
        self.notes.entry(date).or_default().push(note);
    }

    /// Mark `date` as having a daily note backed by `path`.
    pub fn set_daily_note(&mut self, date: DateKey, path: impl Into<String>) {
        let path = path.into();
        self.status.entry(date).or_default().has_daily_note = true;
        self.by_file.entry(path.clone()).or_default().insert(date);
        self.daily_notes.entry(date).or_default().insert(path);
    }

    /// Drop everything `path` contributed. Returns the affected dates in
    /// chronological order.
    pub fn cleanup_file(&mut self, path: &str) -> Vec<DateKey> {
        let Some(dates) = self.by_file.remove(path) else {
            return Vec::new();
        };

        for date in &dates {
            if let Some(notes) = self.notes.get_mut(date) {
                notes.retain(|n| n.path != path);
                if notes.is_empty() {
                    self.notes.remove(date);
                }
            }
            if let Some(paths) = self.daily_notes.get_mut(date) {
                paths.remove(path);
                if paths.is_empty() {
                    self.daily_notes.remove(date);
                }
            }
            self.recompute_status(*date);
        }

        dates.into_iter().collect()
    }

    fn recompute_status(&mut self, date: DateKey) {
        let notes = self.notes.get(&date).map(Vec::as_slice).unwrap_or(&[]);
        let has_daily_note = self.daily_notes.contains_key(&date);

        if notes.is_empty() && !has_daily_note {
            self.status.remove(&date);
            return;
        }

        let status = DateStatus {
            has_daily_note,
            note_count: notes.len(),
            tags: notes.iter().flat_map(|n| n.tags.iter().cloned()).collect(),
        };
        self.status.insert(date, status);
    }

    pub fn get_date_status(&self, date: DateKey) -> DateStatus {
        self.status.get(&date).cloned().unwrap_or_default()
    }

    pub fn get_notes_for_date(&self, date: DateKey) -> &[NoteRecord] {
        self.notes.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Paths of the daily notes for `date`, in path order.
    pub fn daily_note_paths(&self, date: DateKey) -> Vec<&str> {
        self.daily_notes
            .get(&date)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// Number of dates that currently carry a status entry.
    pub fn dated_count(&self) -> usize {
        self.status.len()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
        self.status.clear();
        self.daily_notes.clear();
        self.by_file.clear();
    }
}
