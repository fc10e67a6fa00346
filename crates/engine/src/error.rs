//! Error types for the scoring engine

use thiserror::Error;

/// Errors raised while loading or validating scoring configuration.
///
/// Scoring itself never fails: every division guards its denominator and
/// falls back to a defined value. Only configuration can be rejected.
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Rating weights must sum to 1.0 (±0.01), got {sum}")]
    InvalidWeights { sum: f64 },

    #[error("Percentile bounds must satisfy 0 <= lower < upper <= 100, got {lower}..{upper}")]
    InvalidPercentiles { lower: f64, upper: f64 },

    #[error("Invalid risk configuration: {0}")]
    InvalidRiskConfig(String),

    #[error("Invalid scoring parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type ScoringResult<T> = Result<T, ScoringError>;
