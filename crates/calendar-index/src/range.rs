//! Multi-day ranges and their visual lane layout.
//!
//! Ranges are indexed under every date they span. After any structural
//! change the whole layout is recomputed by a chronological sweep that packs
//! concurrent ranges into at most [`MAX_LANES`] lanes:
//!
//! 1. Lanes and overflow entries whose range ended before the current day are
//!    released.
//! 2. Overflowed short ranges are promoted into free lanes, oldest first.
//! 3. Ranges starting on the day are placed in insertion order.
//! 4. The day's visible lanes and hidden ranges are recorded.
//!
//! Ranges longer than [`MAX_LANE_DURATION_DAYS`] never take a lane. While any
//! range sits in overflow the usable ceiling drops to three lanes, leaving the
//! fourth row for the presentation layer's "+N more" indicator.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::Bound;

use serde::Serialize;

use crate::date_key::DateKey;
use crate::error::{IndexError, Result};

pub const MAX_LANES: u8 = 4;
/// Lane ceiling while anything is in overflow.
pub const CROWDED_LANES: u8 = 3;
/// Lanes that stay visible even on crowded days.
pub const ALWAYS_VISIBLE_LANES: u8 = 2;
/// Longest range, in inclusive days, that may occupy a lane.
pub const MAX_LANE_DURATION_DAYS: i64 = 5;

/// An inclusive multi-day span contributed by one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeRecord {
    pub path: String,
    pub name: String,
    pub start: DateKey,
    pub end: DateKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub tags: BTreeSet<String>,
}

impl RangeRecord {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidRange`] when `end` precedes `start`.
    pub fn new(
        path: impl Into<String>,
        name: impl Into<String>,
        start: DateKey,
        end: DateKey,
    ) -> Result<Self> {
        let path = path.into();
        if end < start {
            return Err(IndexError::InvalidRange(format!(
                "{path}: end {end} is before start {start}"
            )));
        }
        Ok(Self {
            path,
            name: name.into(),
            start,
            end,
            color: None,
            tags: BTreeSet::new(),
        })
    }

    pub fn with_color(mut self, color: Option<String>) -> Self {
        self.color = color;
        self
    }

    pub fn with_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Inclusive length in days; a single-day range is 1.
    pub fn duration_days(&self) -> i64 {
        self.start.days_until(self.end) + 1
    }

    /// Whether the range is short enough to ever hold a lane.
    pub fn is_lane_eligible(&self) -> bool {
        self.duration_days() <= MAX_LANE_DURATION_DAYS
    }
}

/// Computed layout of one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DayLayout {
    /// Every active range with a lane, visible or not.
    lanes: BTreeMap<String, u8>,
    /// The visible subset of `lanes`.
    slots: BTreeMap<String, u8>,
    /// Ranges active on the day without a visible lane, in sweep order.
    hidden: Vec<String>,
    emerging: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct RangeManager {
    records: HashMap<String, RangeRecord>,
    /// Paths in insertion order; the sweep places same-day starts in this order.
    order: Vec<String>,
    by_date: HashMap<DateKey, Vec<String>>,
    by_file: HashMap<String, Vec<DateKey>>,
    layout: HashMap<DateKey, DayLayout>,
    suspended: bool,
    dirty: bool,
}

impl RangeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a range, replacing any range previously held for the same path.
    pub fn add_range(&mut self, record: RangeRecord) {
        self.detach(&record.path);

        let dates: Vec<DateKey> = record.start.through(record.end).collect();
        for date in &dates {
            self.by_date
                .entry(*date)
                .or_default()
                .push(record.path.clone());
        }
        self.by_file.insert(record.path.clone(), dates);
        self.order.push(record.path.clone());
        self.records.insert(record.path.clone(), record);

        self.mark_dirty();
    }

    /// Remove the range held for `path`. Returns whether anything was removed.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let removed = self.detach(path);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    fn detach(&mut self, path: &str) -> bool {
        let Some(dates) = self.by_file.remove(path) else {
            return false;
        };
        for date in dates {
            if let Some(paths) = self.by_date.get_mut(&date) {
                paths.retain(|p| p != path);
                if paths.is_empty() {
                    self.by_date.remove(&date);
                }
            }
        }
        self.order.retain(|p| p != path);
        self.records.remove(path);
        true
    }

    /// Hold layout recomputation until [`resume_layout`](Self::resume_layout);
    /// used by bulk rebuilds.
    pub fn suspend_layout(&mut self) {
        self.suspended = true;
    }

    pub fn resume_layout(&mut self) {
        self.suspended = false;
        if self.dirty {
            self.recompute_layout();
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        if !self.suspended {
            self.recompute_layout();
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
        self.by_date.clear();
        self.by_file.clear();
        self.layout.clear();
        self.dirty = false;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get_range(&self, path: &str) -> Option<&RangeRecord> {
        self.records.get(path)
    }

    /// Every range spanning `date`, in insertion order.
    pub fn get_ranges_for_date(&self, date: DateKey) -> Vec<&RangeRecord> {
        self.by_date
            .get(&date)
            .into_iter()
            .flatten()
            .filter_map(|path| self.records.get(path))
            .collect()
    }

    /// Visible lanes on `date`, keyed by path.
    pub fn get_range_slots(&self, date: DateKey) -> BTreeMap<String, u8> {
        self.layout
            .get(&date)
            .map(|day| day.slots.clone())
            .unwrap_or_default()
    }

    /// Every lane held on `date`, including lanes hidden on crowded days.
    pub fn get_lane_assignments(&self, date: DateKey) -> BTreeMap<String, u8> {
        self.layout
            .get(&date)
            .map(|day| day.lanes.clone())
            .unwrap_or_default()
    }

    /// Ranges active on `date` that are not drawn in a lane.
    pub fn get_overflow(&self, date: DateKey) -> Vec<String> {
        self.layout
            .get(&date)
            .map(|day| day.hidden.clone())
            .unwrap_or_default()
    }

    /// Ranges that became visible on `date` after having started earlier.
    pub fn get_emerging(&self, date: DateKey) -> BTreeSet<String> {
        self.layout
            .get(&date)
            .map(|day| day.emerging.clone())
            .unwrap_or_default()
    }

    fn recompute_layout(&mut self) {
        self.dirty = false;
        let ranges: Vec<&RangeRecord> = self
            .order
            .iter()
            .filter_map(|path| self.records.get(path))
            .collect();
        self.layout = sweep(&ranges);
        tracing::debug!(ranges = ranges.len(), days = self.layout.len(), "range layout recomputed");
    }
}

/// Usable lanes given the current overflow count. Promotion counts the
/// candidate itself, so a promoted range never lands in the last lane.
fn lane_ceiling(overflowed: usize) -> u8 {
    if overflowed > 0 {
        CROWDED_LANES
    } else {
        MAX_LANES
    }
}

fn free_lane(occupied: &BTreeSet<u8>, ceiling: u8) -> Option<u8> {
    (0..ceiling).find(|lane| !occupied.contains(lane))
}

fn sweep(ranges: &[&RangeRecord]) -> HashMap<DateKey, DayLayout> {
    let mut layout = HashMap::new();

    let mut starts: BTreeMap<DateKey, Vec<usize>> = BTreeMap::new();
    for (idx, range) in ranges.iter().enumerate() {
        starts.entry(range.start).or_default().push(idx);
    }
    let (Some(mut day), Some(last_day)) = (
        starts.keys().next().copied(),
        ranges.iter().map(|r| r.end).max(),
    ) else {
        return layout;
    };

    let mut active: Vec<(usize, u8)> = Vec::new();
    let mut occupied: BTreeSet<u8> = BTreeSet::new();
    let mut overflow: Vec<usize> = Vec::new();
    let mut previously_visible: HashSet<usize> = HashSet::new();

    while day <= last_day {
        active.retain(|&(idx, lane)| {
            let keep = ranges[idx].end >= day;
            if !keep {
                occupied.remove(&lane);
            }
            keep
        });
        overflow.retain(|&idx| ranges[idx].end >= day);

        let mut pos = 0;
        while pos < overflow.len() {
            let idx = overflow[pos];
            if !ranges[idx].is_lane_eligible() {
                pos += 1;
                continue;
            }
            match free_lane(&occupied, lane_ceiling(overflow.len())) {
                Some(lane) => {
                    occupied.insert(lane);
                    active.push((idx, lane));
                    overflow.remove(pos);
                }
                None => pos += 1,
            }
        }

        for &idx in starts.get(&day).into_iter().flatten() {
            let lane = if ranges[idx].is_lane_eligible() {
                free_lane(&occupied, lane_ceiling(overflow.len()))
            } else {
                None
            };
            match lane {
                Some(lane) => {
                    occupied.insert(lane);
                    active.push((idx, lane));
                }
                None => overflow.push(idx),
            }
        }

        if active.is_empty() && overflow.is_empty() {
            // Nothing spans the gap; resume at the next start.
            previously_visible.clear();
            match starts
                .range((Bound::Excluded(day), Bound::Unbounded))
                .next()
            {
                Some((next, _)) => {
                    day = *next;
                    continue;
                }
                None => break,
            }
        }

        let crowded = active.len() + overflow.len() > usize::from(MAX_LANES) || !overflow.is_empty();
        let mut visible = HashSet::with_capacity(active.len());
        let mut today = DayLayout::default();

        for &(idx, lane) in &active {
            let range = ranges[idx];
            today.lanes.insert(range.path.clone(), lane);
            if lane < ALWAYS_VISIBLE_LANES || !crowded {
                visible.insert(idx);
                today.slots.insert(range.path.clone(), lane);
                if !previously_visible.contains(&idx) && day > range.start {
                    today.emerging.insert(range.path.clone());
                }
            } else {
                today.hidden.push(range.path.clone());
            }
        }
        today
            .hidden
            .extend(overflow.iter().map(|&idx| ranges[idx].path.clone()));

        layout.insert(day, today);
        previously_visible = visible;

        match day.succ() {
            Some(next) => day = next,
            None => break,
        }
    }

    layout
}
