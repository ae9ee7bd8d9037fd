//! Error types for calendar-index operations.
//!
//! None of these are fatal to the index: the service logs them per document
//! and keeps going. They exist so the parsing helpers can say *why* a value
//! was rejected.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Document source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
