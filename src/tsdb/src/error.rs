//! Error types for the sample store.
//!
//! Caller errors (`IndexOutOfRange`, `InvalidRange`, `OutOfOrder`, ...) are
//! reported before any state changes. Page I/O errors abort the triggering
//! append or query; nothing is retried.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("sample index {index} out of range, sample count is {count}")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("invalid range: last index {last} is before first index {first}")]
    InvalidRange { first: usize, last: usize },

    #[error("page io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt page file {}: {reason}", path.display())]
    CorruptPage { path: PathBuf, reason: String },

    #[error("timestamp {timestamp} is older than the previous timestamp {previous}")]
    OutOfOrder { previous: i64, timestamp: i64 },

    #[error("expected {expected} values per sample, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("store has been disposed")]
    Disposed,

    #[error("dataset {0} holds a partly written row, clear it before appending")]
    Inconsistent(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptPage {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
