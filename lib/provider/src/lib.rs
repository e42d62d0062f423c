//! Conversations provider gateway for masked-sms.
//!
//! This crate provides:
//!
//! - **Gateway trait**: The remote capabilities the service relies on
//! - **Twilio client**: REST implementation with basic auth and form bodies
//! - **Recording gateway**: In-memory double for exercising callers

pub mod config;
pub mod error;
pub mod gateway;
pub mod recording;
pub mod twilio;
pub mod types;

pub use config::TwilioConfig;
pub use error::{ConfigError, ProviderError};
pub use gateway::ConversationsGateway;
pub use recording::{CallKind, RecordedCall, RecordingGateway};
pub use twilio::TwilioClient;
pub use types::{
    Conversation, ON_MESSAGE_ADDED, Participant, SentMessage, Webhook, WebhookConfiguration,
    WebhookReconciliation, WebhookSubscription,
};
