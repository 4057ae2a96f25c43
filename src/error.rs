use thiserror::Error;

/// Error taxonomy for the alignment core.
///
/// Every fallible public operation returns `Result<T, AlignError>`. No
/// variant is recovered internally; callers decide whether to retry
/// (e.g. `BandInfeasible` carries a suggested minimum width).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlignError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid audio: {0}")]
    InvalidAudio(String),

    #[error("empty input: {0}")]
    EmptyInput(String),

    #[error("band cannot reach the terminal cell; retry with window width >= {suggested_width}")]
    BandInfeasible { suggested_width: usize },

    #[error("reference mismatch: {0}")]
    ReferenceMismatch(String),

    #[error("alignment cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, AlignError>;
