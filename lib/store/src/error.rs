//! Error types for the store crate.
//!
//! Errors are designed for layered context using rootcause: callers wrap a
//! `Report<StoreError>` with their own context as it propagates.

use std::fmt;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    Io { path: String, reason: String },
    /// The backing file exists but is not a valid store document.
    Corrupt { path: String, reason: String },
    /// The in-memory document could not be serialized.
    Serialize { reason: String },
    /// A binding for this number already exists under another participant.
    DuplicateNumber { number: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "store I/O failed for '{path}': {reason}"),
            Self::Corrupt { path, reason } => {
                write!(f, "store document '{path}' is corrupt: {reason}")
            }
            Self::Serialize { reason } => write!(f, "store serialization failed: {reason}"),
            Self::DuplicateNumber { number } => {
                write!(f, "a binding for {number} already exists")
            }
        }
    }
}

impl std::error::Error for StoreError {}
