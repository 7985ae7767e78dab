//! Decode error types

use thiserror::Error;

/// Errors that can occur while decoding a backend response body
///
/// Any of these marks the whole response as unusable; decoding never
/// skips individual rows.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The payload is not a JSON array of row objects
    #[error("response is not a JSON array of rows: {0}")]
    Json(#[from] serde_json::Error),

    /// The reserved time column held a non-string value
    #[error("time column in row {row} is not a string")]
    TimeNotString { row: usize },

    /// A time value did not match any known timestamp layout
    #[error("failed to parse time value '{value}': {source}")]
    Time {
        value: String,
        source: chrono::ParseError,
    },
}

/// Result type for decode operations
pub type DecodeResult<T> = Result<T, DecodeError>;
