//! Task date axes and carry-forward lookup.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::date_key::{inclusive_end_date, DateKey};

/// One of the independent dates a task is bucketed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAxis {
    /// Every day of the scheduled span.
    Scheduled,
    Due,
    Completed,
    /// A historical completion of one instance of a recurring task.
    Instance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub path: String,
    pub name: String,
    pub status: String,
    /// Scheduled start; date-only values sit at midnight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DateKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<DateKey>,
    pub complete_instances: Vec<DateKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub projects: Vec<String>,
    /// Estimated duration in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_estimate: Option<u32>,
    pub tags: BTreeSet<String>,
}

impl TaskRecord {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            status: "open".to_string(),
            scheduled: None,
            due: None,
            completed_date: None,
            complete_instances: Vec::new(),
            priority: None,
            projects: Vec::new(),
            time_estimate: None,
            tags: BTreeSet::new(),
        }
    }

    pub fn scheduled_date(&self) -> Option<DateKey> {
        self.scheduled.and_then(|dt| DateKey::new(dt.date()))
    }

    /// First and last day of the scheduled span. Without an estimate the span
    /// is the scheduled day alone.
    pub fn scheduled_span(&self) -> Option<(DateKey, DateKey)> {
        let start = self.scheduled?;
        let first = DateKey::new(start.date())?;
        let last = DateKey::new(inclusive_end_date(start, self.time_estimate.unwrap_or(0)))
            .unwrap_or(first);
        Some((first, last.max(first)))
    }
}

#[derive(Debug, Default)]
pub struct TaskManager {
    tasks: HashMap<String, TaskRecord>,
    buckets: HashMap<TaskAxis, HashMap<DateKey, BTreeSet<String>>>,
    by_file: HashMap<String, Vec<(TaskAxis, DateKey)>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `task`, replacing whatever was held for its path.
    pub fn add_task(&mut self, task: TaskRecord) {
        self.remove_file(&task.path);

        let mut entries: Vec<(TaskAxis, DateKey)> = Vec::new();
        if let Some((first, last)) = task.scheduled_span() {
            entries.extend(first.through(last).map(|d| (TaskAxis::Scheduled, d)));
        }
        entries.extend(task.due.map(|d| (TaskAxis::Due, d)));
        entries.extend(task.completed_date.map(|d| (TaskAxis::Completed, d)));
        entries.extend(
            task.complete_instances
                .iter()
                .map(|d| (TaskAxis::Instance, *d)),
        );

        for (axis, date) in &entries {
            self.buckets
                .entry(*axis)
                .or_default()
                .entry(*date)
                .or_default()
                .insert(task.path.clone());
        }
        self.by_file.insert(task.path.clone(), entries);
        self.tasks.insert(task.path.clone(), task);
    }

    /// Remove the task held for `path`, returning it.
    pub fn remove_file(&mut self, path: &str) -> Option<TaskRecord> {
        for (axis, date) in self.by_file.remove(path).unwrap_or_default() {
            if let Some(dates) = self.buckets.get_mut(&axis) {
                if let Some(paths) = dates.get_mut(&date) {
                    paths.remove(path);
                    if paths.is_empty() {
                        dates.remove(&date);
                    }
                }
            }
        }
        self.tasks.remove(path)
    }

    pub fn get_task(&self, path: &str) -> Option<&TaskRecord> {
        self.tasks.get(path)
    }

    /// Dates `path` is bucketed under, across all axes.
    pub fn dates_for_file(&self, path: &str) -> BTreeSet<DateKey> {
        self.by_file
            .get(path)
            .into_iter()
            .flatten()
            .map(|(_, date)| *date)
            .collect()
    }

    /// Tasks bucketed under exactly `axis` on `date`, ordered by path.
    pub fn get_tasks_on_axis(&self, date: DateKey, axis: TaskAxis) -> Vec<&TaskRecord> {
        self.buckets
            .get(&axis)
            .and_then(|dates| dates.get(&date))
            .into_iter()
            .flatten()
            .filter_map(|path| self.tasks.get(path))
            .collect()
    }

    /// Every task relevant to `date`: anything bucketed on it plus every task
    /// scheduled on or before it. The carry-forward has no upper bound;
    /// hiding finished work is left to the caller.
    pub fn get_tasks_for_date(&self, date: DateKey) -> Vec<&TaskRecord> {
        let mut found: BTreeMap<&str, &TaskRecord> = BTreeMap::new();

        for dates in self.buckets.values() {
            for path in dates.get(&date).into_iter().flatten() {
                if let Some(task) = self.tasks.get(path) {
                    found.insert(task.path.as_str(), task);
                }
            }
        }
        for task in self.tasks.values() {
            if task.scheduled_date().is_some_and(|s| s <= date) {
                found.insert(task.path.as_str(), task);
            }
        }

        found.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.buckets.clear();
        self.by_file.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_key::parse_date_time;

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn scheduled(path: &str, at: &str) -> TaskRecord {
        let mut task = TaskRecord::new(path, path);
        task.scheduled = parse_date_time(at);
        task
    }

    fn paths(tasks: Vec<&TaskRecord>) -> Vec<&str> {
        tasks.into_iter().map(|t| t.path.as_str()).collect()
    }

    #[test]
    fn test_scheduled_span_uses_estimate() {
        let mut task = scheduled("t.md", "2024-05-01");
        assert_eq!(task.scheduled_span(), Some((key("2024-05-01"), key("2024-05-01"))));

        task.time_estimate = Some(1440);
        assert_eq!(task.scheduled_span(), Some((key("2024-05-01"), key("2024-05-01"))));

        task.time_estimate = Some(2 * 1440 + 30);
        assert_eq!(task.scheduled_span(), Some((key("2024-05-01"), key("2024-05-03"))));
    }

    #[test]
    fn test_carry_forward_is_unbounded() {
        let mut mgr = TaskManager::new();
        mgr.add_task(scheduled("t.md", "2024-05-01"));

        assert!(mgr.get_tasks_for_date(key("2024-04-30")).is_empty());
        assert_eq!(paths(mgr.get_tasks_for_date(key("2024-05-01"))), vec!["t.md"]);
        assert_eq!(paths(mgr.get_tasks_for_date(key("2031-01-01"))), vec!["t.md"]);
    }

    #[test]
    fn test_due_and_completion_buckets() {
        let mut mgr = TaskManager::new();
        let mut task = TaskRecord::new("t.md", "t");
        task.due = Some(key("2024-05-03"));
        task.completed_date = Some(key("2024-05-02"));
        task.complete_instances = vec![key("2024-04-01"), key("2024-04-08")];
        mgr.add_task(task);

        assert_eq!(paths(mgr.get_tasks_on_axis(key("2024-05-03"), TaskAxis::Due)), vec!["t.md"]);
        assert_eq!(
            paths(mgr.get_tasks_on_axis(key("2024-05-02"), TaskAxis::Completed)),
            vec!["t.md"]
        );
        assert_eq!(paths(mgr.get_tasks_for_date(key("2024-04-08"))), vec!["t.md"]);
        // Unscheduled tasks do not carry forward.
        assert!(mgr.get_tasks_for_date(key("2024-05-04")).is_empty());
    }

    #[test]
    fn test_one_record_per_path() {
        let mut mgr = TaskManager::new();
        let mut first = scheduled("t.md", "2024-05-01");
        first.due = Some(key("2024-05-03"));
        mgr.add_task(first);

        let mut second = scheduled("t.md", "2024-06-01");
        second.status = "in-progress".to_string();
        mgr.add_task(second);

        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.get_task("t.md").unwrap().status, "in-progress");
        assert!(mgr.get_tasks_on_axis(key("2024-05-03"), TaskAxis::Due).is_empty());
        assert!(mgr.get_tasks_for_date(key("2024-05-15")).is_empty());
        assert_eq!(mgr.get_tasks_for_date(key("2024-06-15")).len(), 1);
    }

    #[test]
    fn test_remove_clears_all_axes() {
        let mut mgr = TaskManager::new();
        let mut task = scheduled("t.md", "2024-05-01");
        task.time_estimate = Some(3 * 1440);
        task.due = Some(key("2024-05-10"));
        mgr.add_task(task);
        assert_eq!(mgr.dates_for_file("t.md").len(), 4);

        let removed = mgr.remove_file("t.md");
        assert!(removed.is_some());
        assert!(mgr.is_empty());
        assert!(mgr.dates_for_file("t.md").is_empty());
        assert!(mgr.get_tasks_for_date(key("2024-05-02")).is_empty());
        assert!(mgr.get_tasks_on_axis(key("2024-05-10"), TaskAxis::Due).is_empty());
    }
}
