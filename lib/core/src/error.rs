//! Error handling foundation for masked-sms.
//!
//! This module provides the `Result` type alias using rootcause, plus the
//! parse errors for the core value types. Each crate defines its own
//! domain-specific error types in their own error modules, using rootcause's
//! `.context()` to add layer-appropriate context as errors propagate up the
//! stack.

use rootcause::Report;
use std::fmt;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C> = std::result::Result<T, Report<C>>;

/// Error returned when a phone number is not valid E.164.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePhoneNumberError {
    /// The rejected input.
    pub input: String,
    /// The reason the input was rejected.
    pub reason: &'static str,
}

impl fmt::Display for ParsePhoneNumberError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid phone number '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for ParsePhoneNumberError {}
