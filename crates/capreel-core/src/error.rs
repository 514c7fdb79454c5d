//! Error types for the caption render pipeline
//!
//! Defines the central `RenderError` enum and the `RenderResult` alias
//! used throughout the crate.

use thiserror::Error;

/// Central error type for caption rendering operations
#[derive(Error, Debug)]
pub enum RenderError {
    // =========================================================================
    // Style Errors
    // =========================================================================
    #[error("Invalid caption style: {0}")]
    InvalidStyle(String),

    // =========================================================================
    // Segment Errors
    // =========================================================================
    #[error("Malformed segment at index {index}: {reason}")]
    MalformedSegment { index: usize, reason: String },

    #[error("Transcript parse error: {0}")]
    TranscriptParse(#[from] crate::captions::formats::ParseError),

    // =========================================================================
    // Font Errors
    // =========================================================================
    #[error("No usable font found on this system")]
    NoUsableFont,

    // =========================================================================
    // Encode Errors
    // =========================================================================
    #[error(transparent)]
    Encode(#[from] crate::encode::EncodeError),

    // =========================================================================
    // Job Errors
    // =========================================================================
    #[error("Job queue is full")]
    QueueFull,

    #[error("Job exceeded the hard time limit of {seconds}s")]
    JobTimeout { seconds: u64 },

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for caption rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
