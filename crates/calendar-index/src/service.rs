//! The index facade.
//!
//! [`IndexService`] owns the four managers and is the only way in: writes
//! take a [`Document`] (or a path), extract its facets and fan them out;
//! reads merge what the managers hold into the shapes a calendar view needs.
//!
//! Every write replaces the document's contribution wholesale: first
//! everything it added before is removed, then its current metadata is
//! re-extracted and added back. There is no per-field diffing.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::IndexConfig;
use crate::date_key::DateKey;
use crate::display::{project_symbols, DisplaySymbol, RenderOptions};
use crate::document::{Document, DocumentSource};
use crate::error::Result;
use crate::extract::extract_facets;
use crate::holiday::{Holiday, HolidayOverlay};
use crate::note::{DateStatus, NoteKind, NoteManager, NoteRecord};
use crate::notify::{ChangeBus, DateChange, SubscriptionId};
use crate::range::{RangeManager, RangeRecord};
use crate::recurrence::RecurrenceManager;
use crate::task::{TaskAxis, TaskManager, TaskRecord};

const MARKER_AXES: [TaskAxis; 3] = [TaskAxis::Scheduled, TaskAxis::Due, TaskAxis::Completed];

/// Dates touched by one write, or a flag that the effect is not local.
#[derive(Debug, Default)]
struct Contribution {
    dates: BTreeSet<DateKey>,
    global: bool,
}

impl Contribution {
    fn merge(&mut self, other: Contribution) {
        self.dates.extend(other.dates);
        self.global |= other.global;
    }

    fn into_change(self) -> DateChange {
        if self.global {
            DateChange::Global
        } else {
            DateChange::Dates(self.dates.into_iter().collect())
        }
    }
}

/// Counts after a full rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    pub documents: usize,
    pub dated_days: usize,
    pub ranges: usize,
    pub recurrence_rules: usize,
    pub tasks: usize,
}

/// Everything known about one day.
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub date: DateKey,
    pub status: DateStatus,
    /// Documents acting as the daily note for the date.
    pub daily_notes: Vec<String>,
    pub notes: Vec<NoteRecord>,
    pub ranges: Vec<RangeRecord>,
    pub slots: BTreeMap<String, u8>,
    pub overflow: Vec<String>,
    pub emerging: BTreeSet<String>,
    pub tasks: Vec<TaskRecord>,
    pub holidays: Vec<Holiday>,
}

#[derive(Debug)]
pub struct IndexService {
    config: IndexConfig,
    notes: NoteManager,
    ranges: RangeManager,
    recurrence: RecurrenceManager,
    tasks: TaskManager,
    holidays: HolidayOverlay,
    /// Renamed paths whose metadata the host has not confirmed yet.
    awaiting_fresh: BTreeSet<String>,
    bus: ChangeBus,
}

impl Default for IndexService {
    fn default() -> Self {
        Self::with_config(IndexConfig::default())
    }
}

impl IndexService {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`](crate::error::IndexError::InvalidConfig)
    /// if `config` does not validate.
    pub fn new(config: IndexConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: IndexConfig) -> Self {
        Self {
            config,
            notes: NoteManager::new(),
            ranges: RangeManager::new(),
            recurrence: RecurrenceManager::new(),
            tasks: TaskManager::new(),
            holidays: HolidayOverlay::new(),
            awaiting_fresh: BTreeSet::new(),
            bus: ChangeBus::new(),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn ranges(&self) -> &RangeManager {
        &self.ranges
    }

    pub fn recurrence(&self) -> &RecurrenceManager {
        &self.recurrence
    }

    pub fn tasks(&self) -> &TaskManager {
        &self.tasks
    }

    // ── Writes ──────────────────────────────────────────────────────────

    /// Drop everything and index every document in `source`. Listeners get a
    /// single [`DateChange::Global`] at the end.
    pub fn index_vault(&mut self, source: &impl DocumentSource) -> RebuildSummary {
        self.notes.clear();
        self.ranges.clear();
        self.recurrence.clear();
        self.tasks.clear();
        self.awaiting_fresh.clear();

        let docs = source.documents();
        self.ranges.suspend_layout();
        for doc in &docs {
            self.apply_document(doc);
        }
        self.ranges.resume_layout();

        let summary = RebuildSummary {
            documents: docs.len(),
            dated_days: self.notes.dated_count(),
            ranges: self.ranges.len(),
            recurrence_rules: self.recurrence.rule_count(),
            tasks: self.tasks.len(),
        };
        tracing::info!(
            documents = summary.documents,
            ranges = summary.ranges,
            rules = summary.recurrence_rules,
            tasks = summary.tasks,
            "index rebuilt"
        );
        self.bus.publish(DateChange::Global);
        summary
    }

    /// Re-index one document from its current metadata.
    pub fn index_file(&mut self, doc: &Document) {
        let mut change = self.remove_contributions(&doc.path);
        change.merge(self.apply_document(doc));
        self.bus.publish(change.into_change());
    }

    pub fn remove_file(&mut self, path: &str) {
        self.awaiting_fresh.remove(path);
        let change = self.remove_contributions(path);
        tracing::debug!(path, "document removed");
        self.bus.publish(change.into_change());
    }

    /// Move a document's contribution from `old_path` to `doc.path`.
    ///
    /// Hosts commonly report a rename before the metadata under the new path
    /// is readable, so the document stays pending until
    /// [`confirm_metadata_fresh`](Self::confirm_metadata_fresh) re-indexes it.
    pub fn rename_file(&mut self, doc: &Document, old_path: &str) {
        self.awaiting_fresh.remove(old_path);
        let mut change = self.remove_contributions(old_path);
        change.merge(self.remove_contributions(&doc.path));
        change.merge(self.apply_document(doc));
        self.awaiting_fresh.insert(doc.path.clone());
        tracing::debug!(from = old_path, to = %doc.path, "document renamed");
        self.bus.publish(change.into_change());
    }

    /// Re-index a renamed document now that its metadata is current. Returns
    /// `false`, without indexing, if no rename is pending for `doc.path`.
    pub fn confirm_metadata_fresh(&mut self, doc: &Document) -> bool {
        if !self.awaiting_fresh.remove(&doc.path) {
            return false;
        }
        self.index_file(doc);
        true
    }

    pub fn pending_renames(&self) -> impl Iterator<Item = &str> {
        self.awaiting_fresh.iter().map(String::as_str)
    }

    /// Make sure recurrence occurrences exist for `year` and its neighbours.
    /// Returns whether anything new was materialized.
    pub fn ensure_year_cached(&mut self, year: i32) -> bool {
        let added = self.recurrence.ensure_year_cached(year);
        if added {
            self.bus.publish(DateChange::Global);
        }
        added
    }

    pub fn set_holidays_for_year(&mut self, year: i32, holidays: BTreeMap<DateKey, Vec<Holiday>>) {
        let mut dates: BTreeSet<DateKey> = self.holidays.dates_in(year).into_iter().collect();
        dates.extend(holidays.keys().copied());
        self.holidays.set_year(year, holidays);
        self.bus
            .publish(DateChange::Dates(dates.into_iter().collect()));
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&DateChange) + 'static) -> SubscriptionId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn remove_contributions(&mut self, path: &str) -> Contribution {
        let mut out = Contribution::default();
        out.dates.extend(self.notes.cleanup_file(path));
        out.global |= self.ranges.remove_file(path);
        out.global |= self.recurrence.remove_file(path);

        let task_dates = self.tasks.dates_for_file(path);
        if let Some(task) = self.tasks.remove_file(path) {
            // Carry-forward reaches every day after the scheduled date.
            out.global |= task.scheduled.is_some();
            out.dates.extend(task_dates);
        }
        out
    }

    fn apply_document(&mut self, doc: &Document) -> Contribution {
        let facets = extract_facets(doc, &self.config);
        let mut out = Contribution {
            global: facets.is_structural(),
            ..Contribution::default()
        };

        for (date, note) in facets.notes {
            out.dates.insert(date);
            self.notes.add_note(date, note);
        }
        if let Some(date) = facets.daily_note {
            out.dates.insert(date);
            self.notes.set_daily_note(date, &doc.path);
        }
        if let Some(range) = facets.range {
            self.ranges.add_range(range);
        }
        for (month_day, note) in facets.annual {
            self.recurrence.add_annual(month_day, note);
        }
        if let Some((rule, note)) = facets.rule {
            self.recurrence.add_rule(rule, note);
        }
        if let Some(task) = facets.task {
            out.global |= task.scheduled.is_some();
            self.tasks.add_task(task);
            out.dates.extend(self.tasks.dates_for_file(&doc.path));
        }

        tracing::debug!(path = %doc.path, dates = out.dates.len(), global = out.global, "document indexed");
        out
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn get_date_status(&self, date: DateKey) -> DateStatus {
        self.notes.get_date_status(date)
    }

    /// Point notes, then recurring notes, then task markers.
    ///
    /// A rule occurrence is dropped when the same document already has a
    /// plain note on the date.
    pub fn get_notes_for_date(&self, date: DateKey) -> Vec<NoteRecord> {
        let plain = self.notes.get_notes_for_date(date);
        let plain_paths: BTreeSet<&str> = plain.iter().map(|n| n.path.as_str()).collect();

        let mut out = plain.to_vec();
        out.extend(
            self.recurrence
                .get_notes_for_date(date)
                .into_iter()
                .filter(|n| !(n.kind == NoteKind::Recurring && plain_paths.contains(n.path.as_str()))),
        );
        out.extend(self.task_markers(date));
        out
    }

    fn task_markers(&self, date: DateKey) -> Vec<NoteRecord> {
        let mut markers = Vec::new();
        for axis in MARKER_AXES {
            let Some(style) = self.config.task_indicators.for_axis(axis) else {
                continue;
            };
            for task in self.tasks.get_tasks_on_axis(date, axis) {
                // The scheduled bucket spans the whole estimate; the dot goes
                // on the first day only.
                if axis == TaskAxis::Scheduled && task.scheduled_date() != Some(date) {
                    continue;
                }
                markers.push(
                    NoteRecord::new(&task.path, &task.name, NoteKind::TaskMarker(axis))
                        .with_color(style.color.clone())
                        .with_symbol(Some(style.symbol.clone())),
                );
            }
        }
        markers
    }

    pub fn get_ranges_for_date(&self, date: DateKey) -> Vec<&RangeRecord> {
        self.ranges.get_ranges_for_date(date)
    }

    pub fn get_range_slots(&self, date: DateKey) -> BTreeMap<String, u8> {
        self.ranges.get_range_slots(date)
    }

    pub fn get_range_overflow(&self, date: DateKey) -> Vec<String> {
        self.ranges.get_overflow(date)
    }

    pub fn get_emerging_ranges(&self, date: DateKey) -> BTreeSet<String> {
        self.ranges.get_emerging(date)
    }

    pub fn get_tasks_for_date(&self, date: DateKey) -> Vec<&TaskRecord> {
        self.tasks.get_tasks_for_date(date)
    }

    pub fn get_holidays_for_date(&self, date: DateKey) -> &[Holiday] {
        self.holidays.get(date)
    }

    pub fn get_display_symbols(&self, date: DateKey, options: &RenderOptions) -> Vec<DisplaySymbol> {
        project_symbols(&self.get_notes_for_date(date), options)
    }

    pub fn get_day(&self, date: DateKey) -> DayView {
        DayView {
            date,
            status: self.get_date_status(date),
            daily_notes: self
                .notes
                .daily_note_paths(date)
                .into_iter()
                .map(str::to_string)
                .collect(),
            notes: self.get_notes_for_date(date),
            ranges: self.get_ranges_for_date(date).into_iter().cloned().collect(),
            slots: self.get_range_slots(date),
            overflow: self.get_range_overflow(date),
            emerging: self.get_emerging_ranges(date),
            tasks: self.get_tasks_for_date(date).into_iter().cloned().collect(),
            holidays: self.get_holidays_for_date(date).to_vec(),
        }
    }
}
