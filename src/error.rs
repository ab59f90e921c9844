//! Error types for turncoder
//!
//! The statistics aggregator itself never fails. These errors belong to the
//! collaborators around it: session import, turn log edits and report encoding.

use thiserror::Error;

/// Errors that can occur while loading, editing or encoding a coding session
#[derive(Debug, Error)]
pub enum CodingError {
    #[error("Failed to parse session: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid timestamp for turn {id}: {timestamp}")]
    InvalidTimestamp { id: u64, timestamp: f64 },

    #[error("Duplicate turn id: {0}")]
    DuplicateTurnId(u64),

    #[error("Turn not found: {0}")]
    TurnNotFound(u64),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
