//! Shared application state.

use masked_sms_conversation::ConversationService;
use std::sync::Arc;

/// State handed to every handler.
pub struct AppState {
    /// Orchestrator for conversations and bindings.
    pub service: Arc<ConversationService>,
    /// Message sent to a number once it has been bound.
    pub welcome_message: String,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(service: Arc<ConversationService>, welcome_message: impl Into<String>) -> Self {
        Self {
            service,
            welcome_message: welcome_message.into(),
        }
    }
}
