use thiserror::Error;

use crate::models::SubmissionStatus;

/// Failures raised by the scoring and review engine.
///
/// Empty or single-element inputs to the trend and average computations are not
/// errors: they produce neutral values (a 0.0 slope, an excluded-from-mean entry).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("{dimension} score {value} is outside 0..=100")]
    OutOfRangeScore { dimension: &'static str, value: i64 },

    #[error("unrecognized issue severity: {0:?}")]
    InvalidSeverity(String),

    #[error("unrecognized issue category: {0:?}")]
    InvalidCategory(String),

    #[error("unrecognized submission status: {0:?}")]
    InvalidStatus(String),

    #[error("cannot move submission from {from} to {to}")]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    #[error("published submissions cannot be reviewed again")]
    AlreadyPublished,
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
