//! Error types for the conversation crate.
//!
//! `ConversationError` is a context wrapper: store and provider reports are
//! wrapped with the operation that was running when they failed.

use masked_sms_core::ParticipantSid;
use std::fmt;

/// High-level orchestration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// Resolving the active conversation failed.
    Resolve,
    /// Binding a number to the conversation failed.
    Bind { number: String },
    /// Removing a participant failed.
    Unbind { participant: ParticipantSid },
    /// Sending a message to a number failed.
    Notify { number: String },
    /// Stamping inbound activity failed.
    RecordActivity { number: String },
    /// Listing bindings failed.
    ListBindings,
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => write!(f, "failed to resolve the active conversation"),
            Self::Bind { number } => write!(f, "failed to bind {number}"),
            Self::Unbind { participant } => write!(f, "failed to unbind participant {participant}"),
            Self::Notify { number } => write!(f, "failed to notify {number}"),
            Self::RecordActivity { number } => {
                write!(f, "failed to record activity for {number}")
            }
            Self::ListBindings => write!(f, "failed to list bindings"),
        }
    }
}

impl std::error::Error for ConversationError {}
