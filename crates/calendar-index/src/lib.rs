//! # calendar-index
//!
//! Date-keyed indexing for a collection of metadata-bearing documents.
//!
//! Documents go in through [`IndexService`]; what comes out is an answer to
//! "what is on day D": point notes, multi-day ranges with stable visual lanes,
//! recurring events materialized per year, and tasks across their scheduled,
//! due and completion dates.
//!
//! ## Modules
//!
//! - [`service`]: Incremental and full re-index, cross-facet merging, change notification
//! - [`note`]: Point notes and per-date status
//! - [`range`]: Multi-day ranges and the lane/overflow/emergence sweep
//! - [`recurrence`]: Annual recurrence and RRULE materialization with a per-year cache
//! - [`task`]: Task date axes and carry-forward
//! - [`extract`]: Document metadata → per-manager records
//! - [`document`]: Documents and document sources
//! - [`config`]: Index configuration
//! - [`display`]: Day-cell symbol projection
//! - [`holiday`]: Externally supplied holidays
//! - [`notify`]: Change bus
//! - [`date_key`]: The canonical day identifier
//! - [`error`]: Error types
//!
//! ```
//! use calendar_index::{DateKey, Document, IndexService};
//!
//! let mut index = IndexService::default();
//! index.index_file(&Document::new("notes/launch.md").with("date", "2024-04-01"));
//!
//! let day = DateKey::parse("2024-04-01").unwrap();
//! assert_eq!(index.get_notes_for_date(day).len(), 1);
//! assert_eq!(index.get_date_status(day).note_count, 1);
//! ```

pub mod config;
pub mod date_key;
pub mod display;
pub mod document;
pub mod error;
pub mod extract;
pub mod holiday;
pub mod note;
pub mod notify;
pub mod range;
pub mod recurrence;
pub mod service;
pub mod task;

pub use config::{DailyNoteConfig, DateProperty, IndexConfig, IndicatorStyle, TaskIndicators};
pub use date_key::DateKey;
pub use display::{DisplaySymbol, RenderOptions, TagSymbol};
pub use document::{Document, DocumentSource, InMemorySource};
pub use error::IndexError;
pub use holiday::Holiday;
pub use note::{DateStatus, NoteKind, NoteRecord};
pub use notify::{DateChange, SubscriptionId};
pub use range::RangeRecord;
pub use service::{DayView, IndexService, RebuildSummary};
pub use task::{TaskAxis, TaskRecord};
