use std::path::PathBuf;

use thiserror::Error;

/// Run-level failure: a message plus the process exit code it maps to.
///
/// Exit codes:
/// - `2`: configuration or I/O problems (bad flags, missing data root, bad manifest)
/// - `3`: nothing usable remained (no sample could be extracted)
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Per-sample failure.
///
/// None of these abort a batch. `InvalidBaseline` is only ever recorded as a
/// flag on a successful extraction; the others exclude the sample from
/// aggregation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("failed to read '{}': {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("column lengths differ: strain={strain}, storage={storage}, loss={loss}")]
    LengthMismatch {
        strain: usize,
        storage: usize,
        loss: usize,
    },

    #[error("non-finite {column} value {value} at point {index}")]
    NonFiniteValue {
        column: &'static str,
        index: usize,
        value: f64,
    },

    #[error("strain is not strictly increasing at point {index} ({previous} -> {current})")]
    NonIncreasingStrain {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("no points left after skipping {skipped} of {total}")]
    EmptySeries { total: usize, skipped: usize },

    #[error("baseline storage modulus {storage} is not positive")]
    InvalidBaseline { storage: f64 },

    #[error("batch cancelled before this sample started")]
    Cancelled,
}
