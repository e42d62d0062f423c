//! Domain error types for server operations.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;

/// Errors surfaced by page handlers.
#[derive(Debug)]
pub enum AppError {
    /// The bindings could not be loaded.
    Bindings { details: String },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bindings { details } => write!(f, "failed to load bindings: {details}"),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

/// Reasons a submitted phone form is turned away before any remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// The body was not a form or lacked a field.
    Malformed { details: String },
    /// The phone number is not E.164.
    InvalidNumber { input: String, reason: String },
    /// The expiration is not a positive number of minutes.
    InvalidExpiration { input: String },
    /// The request carried no host to build callback URLs from.
    MissingHost,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { details } => write!(f, "malformed form: {details}"),
            Self::InvalidNumber { input, reason } => {
                write!(f, "invalid phone number '{input}': {reason}")
            }
            Self::InvalidExpiration { input } => {
                write!(f, "invalid expiration '{input}': expected positive minutes")
            }
            Self::MissingHost => write!(f, "request has no host header"),
        }
    }
}

impl std::error::Error for FormError {}
