//! Error types for rolling-window requests.
//!
//! Validation errors are raised before any task grid is allocated and abort
//! the whole call. `KernelFatal` is the only error produced after dispatch.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type RollResult<T> = Result<T, RollError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RollError {
    /// A source column or window argument has an unsupported element kind.
    #[error("{what} at position {position} has unsupported type {found}")]
    InvalidInputType {
        what: &'static str,
        position: usize,
        found: &'static str,
    },

    #[error("n must be non 0 length")]
    EmptyWindowSpec,

    /// A window width is missing, non-positive or not integer-valued.
    #[error("n must be positive integer values (> 0), offending value {value} at position {position}")]
    InvalidWindowWidth { position: usize, value: String },

    #[error("adaptive rolling function can only process 'x' having equal length of elements, series {position} has length {found} but expected {expected}")]
    InconsistentSeriesLength {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("length of integer vector(s) provided as list to 'n' argument must be equal to number of observations provided in 'x': window {position} has length {found}, expected {expected}")]
    WindowLengthMismatch {
        position: usize,
        expected: usize,
        found: usize,
    },

    #[error("fill must be a numeric vector of length 1: {0}")]
    InvalidFillValue(String),

    #[error("using hasNA FALSE and na.rm TRUE does not make sense, if you know there are NA values use hasNA TRUE, otherwise leave it as default NA")]
    ContradictoryNAOptions,

    #[error("using adaptive TRUE and align argument different than 'right' is not implemented")]
    UnsupportedAlignmentForAdaptive,

    #[error("unknown reducer '{0}', expected 'sum' or 'mean'")]
    UnknownReducer(String),

    #[error("unknown align '{0}', expected 'right', 'center' or 'left'")]
    UnknownAlignment(String),

    #[error("unknown algo '{0}', expected 'fast' or 'exact'")]
    UnknownAlgorithm(String),

    /// Unrecoverable failure reported by a kernel through its diagnostics record.
    #[error("froll: {cell}: {message}")]
    KernelFatal { cell: usize, message: String },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

impl From<rayon::ThreadPoolBuildError> for RollError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        RollError::WorkerPool(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_fatal_carries_cell_index() {
        let err = RollError::KernelFatal {
            cell: 3,
            message: "failed to allocate memory".to_string(),
        };
        assert_eq!(err.to_string(), "froll: 3: failed to allocate memory");
    }

    #[test]
    fn invalid_width_reports_position() {
        let err = RollError::InvalidWindowWidth {
            position: 2,
            value: "0".to_string(),
        };
        assert!(err.to_string().contains("at position 2"));
    }
}
