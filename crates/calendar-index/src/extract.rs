//! Turning one document's metadata into per-manager records.
//!
//! Extraction never fails as a whole. Each facet is read independently; a
//! facet whose values are unusable is left out and logged, and the rest of
//! the document is still indexed.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::config::IndexConfig;
use crate::date_key::{inclusive_end_date, DateKey};
use crate::document::Document;
use crate::note::{NoteKind, NoteRecord};
use crate::range::RangeRecord;
use crate::recurrence::RecurrenceRule;
use crate::task::TaskRecord;

/// Everything one document contributes to the index.
#[derive(Debug, Default)]
pub struct DocumentFacets {
    pub notes: Vec<(DateKey, NoteRecord)>,
    pub daily_note: Option<DateKey>,
    pub range: Option<RangeRecord>,
    /// Annual notes keyed by `MM-DD`.
    pub annual: Vec<(String, NoteRecord)>,
    pub rule: Option<(RecurrenceRule, NoteRecord)>,
    pub task: Option<TaskRecord>,
}

impl DocumentFacets {
    /// Whether any facet can move range lanes or recurrence caches.
    pub fn is_structural(&self) -> bool {
        self.range.is_some() || self.rule.is_some() || !self.annual.is_empty()
    }
}

pub fn extract_facets(doc: &Document, config: &IndexConfig) -> DocumentFacets {
    let tags = doc.tags();
    let color = doc.text("color");
    let name = doc.display_name().to_string();

    let mut facets = DocumentFacets {
        daily_note: daily_note_date(doc, config),
        ..DocumentFacets::default()
    };

    if let Some(date) = doc.date("date") {
        let note = NoteRecord::new(&doc.path, &name, NoteKind::Dated)
            .with_color(color.clone())
            .with_tags(tags.clone());
        facets.notes.push((date, note));
    }

    for prop in &config.custom_date_properties {
        let Some(date) = doc.date(&prop.name) else {
            continue;
        };
        let note = NoteRecord::new(&doc.path, &name, NoteKind::Property(prop.name.clone()))
            .with_color(prop.color.clone().or_else(|| color.clone()))
            .with_symbol(prop.symbol.clone())
            .with_tags(tags.clone())
            .recurring(prop.recurring);
        if prop.recurring {
            facets.annual.push((date.month_day(), note));
        } else {
            facets.notes.push((date, note));
        }
    }

    facets.range = explicit_range(doc, &name)
        .or_else(|| scheduled_range(doc, &name))
        .map(|range| range.with_color(color.clone()).with_tags(tags.clone()));

    if let Some(text) = doc.text("recurrence") {
        let anchor = doc.date("scheduled").or_else(|| doc.date("date"));
        match RecurrenceRule::parse(&doc.path, &text, anchor) {
            Ok(rule) => {
                let note = NoteRecord::new(&doc.path, &name, NoteKind::Recurring)
                    .with_color(color.clone())
                    .with_tags(tags.clone());
                facets.rule = Some((rule, note));
            }
            Err(e) => tracing::warn!(path = %doc.path, "skipping recurrence: {e}"),
        }
    }

    if doc.has_tag(config.normalized_task_tag()) {
        facets.task = Some(task_record(doc, &name, tags));
    }

    facets
}

fn explicit_range(doc: &Document, name: &str) -> Option<RangeRecord> {
    let start = doc.date("dateStart")?;
    let end = doc.date("dateEnd")?;
    RangeRecord::new(&doc.path, name, start, end)
        .inspect_err(|e| tracing::warn!("skipping range: {e}"))
        .ok()
}

/// A range implied by `scheduled` plus a `timeEstimate` that spills past the
/// scheduled day. Single-day estimates stay plain tasks.
fn scheduled_range(doc: &Document, name: &str) -> Option<RangeRecord> {
    let start = doc.date_time("scheduled")?;
    let minutes = doc.minutes("timeEstimate")?;
    let first = DateKey::new(start.date())?;
    let last = DateKey::new(inclusive_end_date(start, minutes))?;
    if last <= first {
        return None;
    }
    RangeRecord::new(&doc.path, name, first, last).ok()
}

fn daily_note_date(doc: &Document, config: &IndexConfig) -> Option<DateKey> {
    let daily = &config.daily_notes;
    if let Some(folder) = daily.folder.as_deref() {
        let folder = folder.trim_matches('/');
        let parent = doc.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        if parent != folder {
            return None;
        }
    }
    NaiveDate::parse_from_str(&doc.basename, &daily.format)
        .ok()
        .and_then(DateKey::new)
}

fn task_record(doc: &Document, name: &str, tags: BTreeSet<String>) -> TaskRecord {
    let mut task = TaskRecord::new(&doc.path, name);
    if let Some(status) = doc.text("status") {
        task.status = status;
    }
    task.scheduled = doc.date_time("scheduled");
    task.due = doc.date("due");
    task.completed_date = doc.date("completedDate");
    task.complete_instances = doc.dates("complete_instances");
    task.priority = doc.text("priority");
    task.projects = doc.list("projects");
    task.time_estimate = doc.minutes("timeEstimate");
    task.tags = tags;
    task
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DateProperty;
    use serde_json::json;

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    #[test]
    fn test_plain_dated_note() {
        let doc = Document::new("notes/launch.md")
            .with("date", "2024-04-01")
            .with("tags", json!(["work"]))
            .with("color", "#ff0000");
        let facets = extract_facets(&doc, &IndexConfig::default());

        assert_eq!(facets.notes.len(), 1);
        let (date, note) = &facets.notes[0];
        assert_eq!(*date, key("2024-04-01"));
        assert_eq!(note.name, "launch");
        assert_eq!(note.color.as_deref(), Some("#ff0000"));
        assert!(note.tags.contains("work"));
        assert!(!facets.is_structural());
        assert!(facets.task.is_none());
    }

    #[test]
    fn test_custom_properties_split_by_recurring_flag() {
        let mut config = IndexConfig::default();
        config.custom_date_properties = vec![
            DateProperty {
                name: "birthday".into(),
                color: Some("pink".into()),
                symbol: Some("🎂".into()),
                recurring: true,
            },
            DateProperty {
                name: "met".into(),
                color: None,
                symbol: Some("🤝".into()),
                recurring: false,
            },
        ];
        let doc = Document::new("people/ada.md")
            .with("birthday", "1815-12-10")
            .with("met", "2024-02-02")
            .with("color", "blue");
        let facets = extract_facets(&doc, &config);

        assert_eq!(facets.annual.len(), 1);
        assert_eq!(facets.annual[0].0, "12-10");
        assert!(facets.annual[0].1.recurring);
        assert_eq!(facets.annual[0].1.color.as_deref(), Some("pink"));

        assert_eq!(facets.notes.len(), 1);
        let (date, note) = &facets.notes[0];
        assert_eq!(*date, key("2024-02-02"));
        assert_eq!(note.kind, NoteKind::Property("met".into()));
        assert_eq!(note.color.as_deref(), Some("blue"));
        assert_eq!(note.symbol.as_deref(), Some("🤝"));
    }

    #[test]
    fn test_explicit_range_beats_scheduled_estimate() {
        let doc = Document::new("trip.md")
            .with("dateStart", "2024-03-01")
            .with("dateEnd", "2024-03-03")
            .with("scheduled", "2024-05-01")
            .with("timeEstimate", 4 * 1440);
        let range = extract_facets(&doc, &IndexConfig::default()).range.unwrap();
        assert_eq!(range.start, key("2024-03-01"));
        assert_eq!(range.end, key("2024-03-03"));
    }

    #[test]
    fn test_inverted_explicit_range_falls_back_to_estimate() {
        let doc = Document::new("trip.md")
            .with("dateStart", "2024-03-05")
            .with("dateEnd", "2024-03-01")
            .with("scheduled", "2024-05-01")
            .with("timeEstimate", 2 * 1440);
        let range = extract_facets(&doc, &IndexConfig::default()).range.unwrap();
        assert_eq!(range.start, key("2024-05-01"));
        assert_eq!(range.end, key("2024-05-02"));

        let bare = Document::new("bad.md")
            .with("dateStart", "2024-03-05")
            .with("dateEnd", "2024-03-01");
        assert!(extract_facets(&bare, &IndexConfig::default()).range.is_none());
    }

    #[test]
    fn test_single_day_estimate_is_not_a_range() {
        let doc = Document::new("t.md")
            .with("scheduled", "2024-05-01")
            .with("timeEstimate", 1440);
        assert!(extract_facets(&doc, &IndexConfig::default()).range.is_none());
    }

    #[test]
    fn test_recurrence_anchor_and_bad_rules() {
        let doc = Document::new("standup.md")
            .with("scheduled", "2024-01-01")
            .with("recurrence", "DTSTART:20230101T000000Z;FREQ=WEEKLY;BYDAY=MO");
        let (rule, note) = extract_facets(&doc, &IndexConfig::default()).rule.unwrap();
        assert_eq!(rule.anchor, key("2024-01-01"));
        assert!(note.recurring);

        let broken = Document::new("broken.md")
            .with("date", "2024-01-01")
            .with("recurrence", "EVERY SO OFTEN");
        let facets = extract_facets(&broken, &IndexConfig::default());
        assert!(facets.rule.is_none());
        // The rest of the document is still indexed.
        assert_eq!(facets.notes.len(), 1);
    }

    #[test]
    fn test_task_fields() {
        let doc = Document::new("tasks/ship.md")
            .with("tags", json!(["#Task", "release"]))
            .with("status", "in-progress")
            .with("scheduled", "2024-05-01T09:00")
            .with("due", "2024-05-03")
            .with("priority", "high")
            .with("projects", json!(["[[Launch]]"]))
            .with("complete_instances", json!(["2024-04-24", "junk"]))
            .with("timeEstimate", "90");
        let task = extract_facets(&doc, &IndexConfig::default()).task.unwrap();

        assert_eq!(task.status, "in-progress");
        assert_eq!(task.scheduled_date(), Some(key("2024-05-01")));
        assert_eq!(task.due, Some(key("2024-05-03")));
        assert_eq!(task.priority.as_deref(), Some("high"));
        assert_eq!(task.projects, vec!["[[Launch]]"]);
        assert_eq!(task.complete_instances, vec![key("2024-04-24")]);
        assert_eq!(task.time_estimate, Some(90));
    }

    #[test]
    fn test_configured_task_tag() {
        let mut config = IndexConfig::default();
        config.task_tag = " #Todo".into();
        let doc = Document::new("t.md").with("tags", "todo");
        assert!(extract_facets(&doc, &config).task.is_some());

        let plain = Document::new("p.md").with("tags", "task");
        assert!(extract_facets(&plain, &config).task.is_none());
    }

    #[test]
    fn test_daily_note_detection() {
        let mut config = IndexConfig::default();
        assert_eq!(
            extract_facets(&Document::new("journal/2024-01-05.md"), &config).daily_note,
            Some(key("2024-01-05"))
        );

        config.daily_notes.folder = Some("daily/".into());
        assert!(extract_facets(&Document::new("journal/2024-01-05.md"), &config)
            .daily_note
            .is_none());
        assert_eq!(
            extract_facets(&Document::new("daily/2024-01-05.md"), &config).daily_note,
            Some(key("2024-01-05"))
        );
        assert!(extract_facets(&Document::new("daily/notes.md"), &config)
            .daily_note
            .is_none());
    }
}
