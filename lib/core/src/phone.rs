//! E.164 phone numbers.

use crate::error::ParsePhoneNumberError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum number of digits allowed by E.164.
const MAX_DIGITS: usize = 15;

/// An E.164 phone number such as `+15550001`.
///
/// Common separators (spaces, dashes, dots and parentheses) are stripped on
/// parse; what remains must be a `+` followed by up to fifteen digits, the
/// first of which is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Parses and normalizes a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not an E.164 number.
    pub fn parse(input: &str) -> Result<Self, ParsePhoneNumberError> {
        let normalized: String = input
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
            .collect();

        let reject = |reason| ParsePhoneNumberError {
            input: input.to_string(),
            reason,
        };

        let digits = normalized
            .strip_prefix('+')
            .ok_or_else(|| reject("missing leading '+'"))?;
        if digits.is_empty() {
            return Err(reject("no digits after '+'"));
        }
        if digits.len() > MAX_DIGITS {
            return Err(reject("more than 15 digits"));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(reject("contains non-digit characters"));
        }
        if digits.starts_with('0') {
            return Err(reject("country code cannot start with 0"));
        }

        Ok(Self(normalized))
    }

    /// Returns the number in E.164 form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PhoneNumber {
    type Err = ParsePhoneNumberError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ParsePhoneNumberError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(number: PhoneNumber) -> Self {
        number.0
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
