use thiserror::Error;

use hifitime::Epoch;

#[derive(Error, Debug)]
pub enum WeftError {
    #[error("Invalid preamble: {0}")]
    PreambleInvalid(String),

    #[error("Unknown block marker: {0:#04x} {1:#04x}")]
    BadMarker(u8, u8),

    #[error("Truncated block while reading {0}")]
    TruncatedBlock(&'static str),

    #[error("Size mismatch for {context}: expected {expected}, got {got}")]
    SizeMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Expected {expected} forty-eight hour blocks for section, got {got}")]
    BlockCountMismatch { expected: u32, got: u32 },

    #[error("Out of order block: {0}")]
    OutOfOrderBlock(&'static str),

    #[error("Invalid value {value} for field {field}")]
    InvalidFieldValue { field: &'static str, value: i64 },

    #[error("Incompatible preambles on field {field}: {left} vs {right}")]
    IncompatiblePreambles {
        field: &'static str,
        left: String,
        right: String,
    },

    #[error("No block covers instant {0}")]
    OutOfRange(Epoch),

    #[error("Insufficient samples for fit: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    #[error("Data source provides no timestamps")]
    EmptyDataSource,

    #[error("Least-squares solver failed: {0}")]
    FitFailed(&'static str),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),
}
