//! Error types for the provider crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ProviderError`: Errors from a single provider API call
//! - `ConfigError`: Invalid gateway configuration

use std::fmt;

/// Errors from provider API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    Api {
        status: u16,
        code: Option<u32>,
        message: String,
    },
    /// The request never got a response.
    Transport { reason: String },
    /// The response body could not be decoded.
    Decode { operation: String, reason: String },
    /// A test double was told to fail this call.
    Injected { operation: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api {
                status,
                code,
                message,
            } => {
                if let Some(code) = code {
                    write!(f, "provider returned {status} (code {code}): {message}")
                } else {
                    write!(f, "provider returned {status}: {message}")
                }
            }
            Self::Transport { reason } => write!(f, "provider request failed: {reason}"),
            Self::Decode { operation, reason } => {
                write!(f, "failed to decode '{operation}' response: {reason}")
            }
            Self::Injected { operation } => write!(f, "injected failure for '{operation}'"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors from building a gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is empty.
    Missing { setting: &'static str },
    /// The HTTP client could not be built.
    HttpClient { reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { setting } => write!(f, "missing provider setting: {setting}"),
            Self::HttpClient { reason } => write!(f, "failed to build HTTP client: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_with_code() {
        let err = ProviderError::Api {
            status: 400,
            code: Some(50433),
            message: "Participant already exists".to_string(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("50433"));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Missing {
            setting: "account_sid",
        };
        assert!(err.to_string().contains("account_sid"));
    }
}
