//! Holiday overlay. Data comes from outside, one year at a time, and is
//! stored as given.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::date_key::DateKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Default)]
pub struct HolidayOverlay {
    years: HashMap<i32, BTreeMap<DateKey, Vec<Holiday>>>,
}

impl HolidayOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the holidays held for `year`. Entries dated in another year
    /// are kept under `year` anyway; lookups go by the date's own year, so
    /// they are simply never returned.
    pub fn set_year(&mut self, year: i32, holidays: BTreeMap<DateKey, Vec<Holiday>>) {
        let stray = holidays.keys().filter(|d| d.year() != year).count();
        if stray > 0 {
            tracing::warn!(year, stray, "holiday entries outside their year");
        }
        self.years.insert(year, holidays);
    }

    pub fn get(&self, date: DateKey) -> &[Holiday] {
        self.years
            .get(&date.year())
            .and_then(|days| days.get(&date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dates currently holding holidays for `year`.
    pub fn dates_in(&self, year: i32) -> Vec<DateKey> {
        self.years
            .get(&year)
            .map(|days| days.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_year(&self, year: i32) -> bool {
        self.years.contains_key(&year)
    }
}
