//! Conversation orchestration for masked-sms.
//!
//! Resolves the single active conversation, binds and unbinds phone numbers
//! and relays notifications, keeping the store and the provider in step.

pub mod context;
pub mod error;
pub mod service;

pub use context::ConversationContext;
pub use error::ConversationError;
pub use service::{BindOutcome, ConversationService, DEFAULT_FRIENDLY_NAME};
