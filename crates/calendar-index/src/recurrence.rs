//! Annual and rule-based recurrence.
//!
//! Annual recurrence is keyed by `MM-DD` and answers every year without any
//! expansion. Rule-based recurrence wraps an RRULE body anchored at a start
//! date; its occurrences are expanded one calendar year at a time and cached
//! under the dates they fall on.
//!
//! # Rule text
//!
//! Documents carry rules in several shapes, all accepted:
//!
//! - `FREQ=WEEKLY;BYDAY=MO`
//! - `RRULE:FREQ=WEEKLY;BYDAY=MO`
//! - `DTSTART:20240101T000000Z;FREQ=WEEKLY;BYDAY=MO` (start embedded in the rule)
//!
//! An embedded `DTSTART` is dropped when the anchor is supplied separately
//! and used as the anchor otherwise. Date-only `UNTIL` values cover the whole
//! final day.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{NaiveDate, TimeZone};
use rrule::{RRuleSet, Tz};

use crate::date_key::DateKey;
use crate::error::{IndexError, Result};
use crate::note::NoteRecord;

/// Upper bound on occurrences expanded for one rule in one year.
const MAX_OCCURRENCES_PER_YEAR: u16 = u16::MAX;

/// A parsed repetition rule anchored at a start date.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    pub path: String,
    /// The normalized RRULE body, without `DTSTART` or `RRULE:` labels.
    pub rule: String,
    pub anchor: DateKey,
    set: RRuleSet,
}

impl RecurrenceRule {
    /// Parse `text` for the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidRule`] when no anchor can be found or the
    /// rule body does not parse.
    pub fn parse(
        path: impl Into<String>,
        text: &str,
        anchor: Option<DateKey>,
    ) -> Result<Self> {
        let path = path.into();
        let (embedded, rule) = split_rule_text(text);
        if rule.is_empty() {
            return Err(IndexError::InvalidRule(format!("{path}: empty rule")));
        }
        let anchor = anchor.or(embedded).ok_or_else(|| {
            IndexError::InvalidRule(format!("{path}: no start date for rule `{rule}`"))
        })?;

        let source = format!(
            "DTSTART:{}T000000Z\nRRULE:{}",
            anchor.date().format("%Y%m%d"),
            rule
        );
        let set: RRuleSet = source
            .parse()
            .map_err(|e| IndexError::InvalidRule(format!("{path}: {e}")))?;

        Ok(Self {
            path,
            rule,
            anchor,
            set,
        })
    }

    /// Distinct occurrence dates that fall inside `year`.
    pub fn occurrences_in_year(&self, year: i32) -> BTreeSet<DateKey> {
        // Query a day wider on each side; the year filter below trims it.
        let (Some(first), Some(last)) = (
            NaiveDate::from_ymd_opt(year - 1, 12, 31).and_then(|d| d.and_hms_opt(0, 0, 0)),
            NaiveDate::from_ymd_opt(year + 1, 1, 1).and_then(|d| d.and_hms_opt(23, 59, 59)),
        ) else {
            return BTreeSet::new();
        };

        let result = self
            .set
            .clone()
            .after(Tz::UTC.from_utc_datetime(&first))
            .before(Tz::UTC.from_utc_datetime(&last))
            .all(MAX_OCCURRENCES_PER_YEAR);
        if result.limited {
            tracing::warn!(path = %self.path, year, "recurrence expansion hit the occurrence limit");
        }

        result
            .dates
            .iter()
            .filter_map(|dt| DateKey::new(dt.date_naive()))
            .filter(|d| d.year() == year)
            .collect()
    }
}

/// Split raw rule text into an embedded start date and the RRULE body.
fn split_rule_text(text: &str) -> (Option<DateKey>, String) {
    let mut embedded = None;
    let mut parts: Vec<String> = Vec::new();

    for token in text
        .split([';', '\n', '\r'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        let upper = token.to_ascii_uppercase();
        // "DTSTART;TZID=Europe/Paris:20240101T090000" splits into two tokens.
        if upper.starts_with("DTSTART") || upper.starts_with("TZID=") {
            if let Some((_, value)) = token.rsplit_once(':') {
                embedded = embedded.or_else(|| parse_compact_date(value));
            }
            continue;
        }
        let token = if upper.starts_with("RRULE:") {
            &token["RRULE:".len()..]
        } else {
            token
        };
        parts.push(normalize_until(token));
    }

    (embedded, parts.join(";"))
}

fn parse_compact_date(value: &str) -> Option<DateKey> {
    let value = value.trim();
    let digits = value.get(..8)?;
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        let year = digits[..4].parse().ok()?;
        let month = digits[4..6].parse().ok()?;
        let day = digits[6..8].parse().ok()?;
        return DateKey::from_ymd(year, month, day);
    }
    DateKey::from_metadata(value)
}

/// Pin `UNTIL` to UTC so it agrees with the UTC anchor.
fn normalize_until(token: &str) -> String {
    let Some((key, value)) = token.split_once('=') else {
        return token.to_string();
    };
    if !key.eq_ignore_ascii_case("UNTIL") {
        return token.to_string();
    }
    let value = value.trim();
    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        format!("UNTIL={value}T235959Z")
    } else if value.contains('T') && !value.ends_with('Z') {
        format!("UNTIL={value}Z")
    } else {
        format!("UNTIL={value}")
    }
}

#[derive(Debug, Default)]
pub struct RecurrenceManager {
    annual: HashMap<String, Vec<NoteRecord>>,
    annual_by_file: HashMap<String, BTreeSet<String>>,
    rules: BTreeMap<String, (RecurrenceRule, NoteRecord)>,
    occurrences: HashMap<DateKey, Vec<NoteRecord>>,
    generated_by_file: HashMap<String, BTreeSet<DateKey>>,
    cached: HashSet<(String, i32)>,
    /// Only ever grows, including across [`clear`](Self::clear).
    materialized_years: BTreeSet<i32>,
}

impl RecurrenceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a note that repeats every year on `month_day` (`MM-DD`).
    pub fn add_annual(&mut self, month_day: impl Into<String>, note: NoteRecord) {
        let month_day = month_day.into();
        self.annual_by_file
            .entry(note.path.clone())
            .or_default()
            .insert(month_day.clone());
        self.annual.entry(month_day).or_default().push(note);
    }

    /// Register a rule, replacing any rule held for the same path. The rule is
    /// expanded right away for every year already materialized.
    pub fn add_rule(&mut self, rule: RecurrenceRule, note: NoteRecord) {
        let path = rule.path.clone();
        self.invalidate_rule(&path);
        self.rules.insert(path.clone(), (rule, note));

        let years: Vec<i32> = self.materialized_years.iter().copied().collect();
        for year in years {
            self.materialize(&path, year);
        }
    }

    /// Drop every annual entry and rule contributed by `path`. Returns whether
    /// the path had contributed anything.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let mut touched = false;

        if let Some(keys) = self.annual_by_file.remove(path) {
            touched = true;
            for key in keys {
                if let Some(notes) = self.annual.get_mut(&key) {
                    notes.retain(|n| n.path != path);
                    if notes.is_empty() {
                        self.annual.remove(&key);
                    }
                }
            }
        }

        touched |= self.invalidate_rule(path);
        touched
    }

    /// Forget `path`'s rule and the dates it generated; other rules keep
    /// their cache.
    fn invalidate_rule(&mut self, path: &str) -> bool {
        let had_rule = self.rules.remove(path).is_some();
        for date in self.generated_by_file.remove(path).unwrap_or_default() {
            if let Some(notes) = self.occurrences.get_mut(&date) {
                notes.retain(|n| n.path != path);
                if notes.is_empty() {
                    self.occurrences.remove(&date);
                }
            }
        }
        self.cached.retain(|(p, _)| p != path);
        had_rule
    }

    /// Materialize `year - 1 ..= year + 1` for every rule. Returns whether any
    /// year was newly materialized.
    pub fn ensure_year_cached(&mut self, year: i32) -> bool {
        let missing: Vec<i32> = (year - 1..=year + 1)
            .filter(|y| !self.materialized_years.contains(y))
            .collect();
        if missing.is_empty() {
            return false;
        }

        let paths: Vec<String> = self.rules.keys().cloned().collect();
        for y in &missing {
            for path in &paths {
                self.materialize(path, *y);
            }
            self.materialized_years.insert(*y);
        }
        tracing::debug!(?missing, rules = paths.len(), "recurrence years materialized");
        true
    }

    fn materialize(&mut self, path: &str, year: i32) {
        if self.cached.contains(&(path.to_string(), year)) {
            return;
        }
        let Some((rule, note)) = self.rules.get(path) else {
            return;
        };

        let dates = rule.occurrences_in_year(year);
        let generated = self
            .generated_by_file
            .entry(path.to_string())
            .or_default();
        for date in dates {
            if generated.insert(date) {
                self.occurrences.entry(date).or_default().push(note.clone());
            }
        }
        self.cached.insert((path.to_string(), year));
    }

    pub fn is_year_cached(&self, year: i32) -> bool {
        self.materialized_years.contains(&year)
    }

    pub fn materialized_years(&self) -> impl Iterator<Item = i32> + '_ {
        self.materialized_years.iter().copied()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Dates generated for `path` so far.
    pub fn generated_dates(&self, path: &str) -> BTreeSet<DateKey> {
        self.generated_by_file.get(path).cloned().unwrap_or_default()
    }

    /// Annual notes for the date's `MM-DD` followed by rule occurrences.
    pub fn get_notes_for_date(&self, date: DateKey) -> Vec<NoteRecord> {
        let annual = self.annual.get(&date.month_day()).into_iter().flatten();
        let generated = self.occurrences.get(&date).into_iter().flatten();
        annual.chain(generated).cloned().collect()
    }

    /// Drop all entries but keep the set of materialized years, so rules
    /// registered afterwards expand for them straight away.
    pub fn clear(&mut self) {
        self.annual.clear();
        self.annual_by_file.clear();
        self.rules.clear();
        self.occurrences.clear();
        self.generated_by_file.clear();
        self.cached.clear();
    }
}
