//! Canonical day identifiers and the lenient date readers used on metadata.
//!
//! A [`DateKey`] always renders as `YYYY-MM-DD` with a four-digit year, so the
//! string form sorts exactly like the calendar. Keys outside years 1..=9999
//! cannot be constructed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{self, IndexError};

const KEY_FORMAT: &str = "%Y-%m-%d";
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// A calendar day, keyed as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    /// Wrap a date, rejecting years that would not render as four digits.
    pub fn new(date: NaiveDate) -> Option<Self> {
        (MIN_YEAR..=MAX_YEAR)
            .contains(&date.year())
            .then_some(Self(date))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).and_then(Self::new)
    }

    /// Strict parse of the canonical `YYYY-MM-DD` form.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidDate`] for anything that is not exactly a
    /// zero-padded four-digit-year date.
    pub fn parse(s: &str) -> error::Result<Self> {
        let bytes = s.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shape_ok {
            return Err(IndexError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, KEY_FORMAT)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| IndexError::InvalidDate(s.to_string()))
    }

    /// Lenient read of a user-authored value: accepts the canonical form, a
    /// datetime whose first ten characters are a date, and `[[wiki-link]]`
    /// wrapped dates. Anything else is treated as absent.
    pub fn from_metadata(raw: &str) -> Option<Self> {
        let s = strip_wiki_link(raw.trim());
        if s.len() > 10 && s.is_char_boundary(10) {
            let (head, tail) = s.split_at(10);
            if tail.starts_with('T') || tail.starts_with(' ') {
                return Self::parse(head).ok();
            }
            return None;
        }
        Self::parse(s).ok()
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// The `MM-DD` key used by annual (legacy) recurrence.
    pub fn month_day(&self) -> String {
        format!("{:02}-{:02}", self.0.month(), self.0.day())
    }

    pub fn add_days(&self, days: i64) -> Option<Self> {
        self.0
            .checked_add_signed(Duration::days(days))
            .and_then(Self::new)
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().and_then(Self::new)
    }

    /// Signed whole days from `self` to `other`.
    pub fn days_until(&self, other: DateKey) -> i64 {
        (other.0 - self.0).num_days()
    }

    /// Every key from `self` through `end`, inclusive. Empty when `end < self`.
    pub fn through(self, end: DateKey) -> impl Iterator<Item = DateKey> {
        self.0
            .iter_days()
            .take_while(move |d| *d <= end.0)
            .map(DateKey)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEY_FORMAT))
    }
}

impl FromStr for DateKey {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn strip_wiki_link(s: &str) -> &str {
    let inner = s
        .strip_prefix("[[")
        .and_then(|rest| rest.strip_suffix("]]"))
        .unwrap_or(s);
    // "[[2024-01-01|New Year]]" keeps only the link target
    inner.split('|').next().unwrap_or(inner).trim()
}

/// Read a date or datetime value. Date-only values resolve to midnight.
pub fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    let s = strip_wiki_link(raw.trim());
    if let Ok(key) = DateKey::parse(s) {
        return key.date().and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local()).filter(|dt| DateKey::new(dt.date()).is_some());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .filter(|dt| DateKey::new(dt.date()).is_some())
}

/// Last day covered by something starting at `start` and lasting `minutes`.
///
/// One minute is subtracted before truncating so that an exact multiple of a
/// day ends on the previous day: 1440 minutes from midnight is a one-day span.
pub fn inclusive_end_date(start: NaiveDateTime, minutes: u32) -> NaiveDate {
    if minutes == 0 {
        return start.date();
    }
    start
        .checked_add_signed(Duration::minutes(i64::from(minutes) - 1))
        .map(|end| end.date())
        .unwrap_or_else(|| start.date())
}
