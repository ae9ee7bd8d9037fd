//! Index configuration.
//!
//! Everything is optional in JSON; missing fields take the defaults below.
//!
//! ```
//! use calendar_index::IndexConfig;
//!
//! let config = IndexConfig::from_json_str(r#"{
//!     "custom_date_properties": [
//!         { "name": "birthday", "symbol": "🎂", "recurring": true }
//!     ],
//!     "task_indicators": { "scheduled": { "symbol": "•" } }
//! }"#).unwrap();
//! assert_eq!(config.task_tag, "task");
//! ```

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::task::TaskAxis;

/// Metadata keys with built-in meaning; custom properties may not reuse them.
pub const RESERVED_KEYS: &[&str] = &[
    "date",
    "dateStart",
    "dateEnd",
    "scheduled",
    "due",
    "timeEstimate",
    "status",
    "priority",
    "projects",
    "complete_instances",
    "completedDate",
    "recurrence",
    "tags",
    "tag",
    "color",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub custom_date_properties: Vec<DateProperty>,
    /// Tag that classifies a document as a task (compared without `#`, case-insensitively).
    pub task_tag: String,
    pub daily_notes: DailyNoteConfig,
    pub task_indicators: TaskIndicators,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            custom_date_properties: Vec::new(),
            task_tag: "task".to_string(),
            daily_notes: DailyNoteConfig::default(),
            task_indicators: TaskIndicators::default(),
        }
    }
}

/// A user-defined metadata key holding a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateProperty {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    /// Repeat every year on the same month and day.
    #[serde(default)]
    pub recurring: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyNoteConfig {
    /// Folder daily notes live in; `None` accepts any folder.
    pub folder: Option<String>,
    /// chrono format of the daily note basename.
    pub format: String,
}

impl Default for DailyNoteConfig {
    fn default() -> Self {
        Self {
            folder: None,
            format: "%Y-%m-%d".to_string(),
        }
    }
}

/// Styles for the markers synthesized on task dates. An axis without a
/// style gets no marker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskIndicators {
    pub scheduled: Option<IndicatorStyle>,
    pub due: Option<IndicatorStyle>,
    pub completed: Option<IndicatorStyle>,
}

impl TaskIndicators {
    pub fn for_axis(&self, axis: TaskAxis) -> Option<&IndicatorStyle> {
        match axis {
            TaskAxis::Scheduled => self.scheduled.as_ref(),
            TaskAxis::Due => self.due.as_ref(),
            TaskAxis::Completed => self.completed.as_ref(),
            TaskAxis::Instance => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorStyle {
    pub symbol: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl IndexConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] on malformed JSON or when
    /// [`validate`](Self::validate) fails.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| IndexError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`IndexError::InvalidConfig`] for an empty task tag, an unusable
    /// daily-note format, or a custom property that is blank, duplicated, or
    /// shadows a built-in key.
    pub fn validate(&self) -> Result<()> {
        if self.task_tag.trim_start_matches('#').trim().is_empty() {
            return Err(IndexError::InvalidConfig("task_tag is empty".to_string()));
        }

        let sample = NaiveDate::from_ymd_opt(2024, 11, 23)
            .ok_or_else(|| IndexError::InvalidConfig("sample date".to_string()))?;
        let mut rendered = String::new();
        let round_trips = write!(rendered, "{}", sample.format(&self.daily_notes.format)).is_ok()
            && NaiveDate::parse_from_str(&rendered, &self.daily_notes.format).ok() == Some(sample);
        if !round_trips {
            return Err(IndexError::InvalidConfig(format!(
                "daily note format `{}` does not identify a date",
                self.daily_notes.format
            )));
        }

        let mut seen = HashSet::new();
        for prop in &self.custom_date_properties {
            let name = prop.name.trim();
            if name.is_empty() {
                return Err(IndexError::InvalidConfig(
                    "custom date property with empty name".to_string(),
                ));
            }
            if RESERVED_KEYS.contains(&name) {
                return Err(IndexError::InvalidConfig(format!(
                    "custom date property `{name}` shadows a built-in key"
                )));
            }
            if !seen.insert(name) {
                return Err(IndexError::InvalidConfig(format!(
                    "custom date property `{name}` is listed twice"
                )));
            }
        }
        Ok(())
    }

    /// The task tag without a leading `#`.
    pub fn normalized_task_tag(&self) -> &str {
        self.task_tag.trim().trim_start_matches('#')
    }
}
