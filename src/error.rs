//! Structured error types for the report engine.
//!
//! The variants follow the recovery boundaries: a `ValidationError` aborts a
//! submission before any work happens, an `ImageError` or `ChartError` is
//! absorbed at the failing photo or chart block, and everything else
//! propagates to the caller of the render/export action.

use thiserror::Error;

/// Rejected evaluation input. Detected before any processing begins.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required identity field is blank.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// No score was submitted for a criterion.
    #[error("missing score for criterion '{0}'")]
    MissingScore(String),

    /// A score falls outside the accepted 1..=10 range.
    #[error("score for criterion '{criterion}' must be between 1 and 10, got {value}")]
    ScoreOutOfRange { criterion: String, value: i64 },
}

/// A single photo failed to decode or re-encode. Recovered locally:
/// the photo is logged and skipped, never aborting the report.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// A decorative chart block could not be drawn. Recovered locally:
/// the block is logged and skipped, surrounding sections are unaffected.
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("missing score for chart criterion '{0}'")]
    MissingScore(String),
}

/// The evaluation store could not be read, or a stored photo could not
/// be fetched. Collection read failures abort the overview and disable
/// the dependent exports.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read evaluation collection: {0}")]
    Read(String),

    #[error("failed to parse evaluation collection: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to fetch photo '{source_ref}': {reason}")]
    PhotoFetch { source_ref: String, reason: String },
}

/// The unified error type returned by the top-level render/export actions.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to parse evaluation input: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to build workbook: {0}")]
    Workbook(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("report generation failed: {0}")]
    Render(String),
}
