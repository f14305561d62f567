//! Error types for metaflux

use thiserror::Error;

/// Errors that can occur during ingestion, aggregation or encoding.
///
/// Configuration errors are fatal and reported before any row is processed;
/// malformed rows are never errors, they are dropped and counted in the
/// [`IngestReport`](crate::ingest::IngestReport).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid light cycle code: {0:?} (expected \"1\", \"2\" or \"3\")")]
    InvalidCycleCode(String),

    #[error("invalid window alignment code: {0:?} (expected \"1\", \"2\" or \"3\")")]
    InvalidAlignmentCode(String),

    #[error("invalid day start hour: {0} (expected 0-23)")]
    InvalidDayStartHour(u32),

    #[error("invalid day count: {0} (must be at least 1)")]
    InvalidDayCount(u32),

    #[error("cycle schedule has {got} entries but the analysis spans {days} days")]
    ScheduleLengthMismatch { got: usize, days: u32 },

    #[error("required column not found in source: {0}")]
    MissingColumn(String),

    #[error("failed to read tabular source: {0}")]
    CsvError(#[from] csv::Error),

    #[error("invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("date parse error: {0}")]
    DateParseError(String),

    #[error("encoding error: {0}")]
    EncodingError(String),
}
