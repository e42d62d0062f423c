//! Provider resources as seen by this service.
//!
//! Only the fields this service reads are modelled; everything else in the
//! provider's responses is ignored on decode.

use masked_sms_core::{ConversationSid, MessageSid, ParticipantSid, WebhookSid};
use serde::{Deserialize, Serialize};

/// Event filter for messages added to a conversation.
pub const ON_MESSAGE_ADDED: &str = "onMessageAdded";

/// A remote conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub sid: ConversationSid,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// A participant added to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub sid: ParticipantSid,
    #[serde(default)]
    pub conversation_sid: Option<ConversationSid>,
}

/// Target configuration of a webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfiguration {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub filters: Vec<String>,
}

/// A conversation-scoped webhook subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub sid: WebhookSid,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub configuration: WebhookConfiguration,
}

/// A message accepted for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    pub sid: MessageSid,
    #[serde(default)]
    pub status: Option<String>,
}

/// The desired webhook configuration for a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSubscription {
    /// Absolute URL the provider posts events to.
    pub url: String,
    /// HTTP method the provider uses.
    pub method: String,
    /// Event filters.
    pub filters: Vec<String>,
}

impl WebhookSubscription {
    /// Subscription for "message added" events posted to
    /// `{callback_base_url}/conversation/`.
    #[must_use]
    pub fn message_added(callback_base_url: &str) -> Self {
        Self {
            url: format!("{}/conversation/", callback_base_url.trim_end_matches('/')),
            method: "POST".to_string(),
            filters: vec![ON_MESSAGE_ADDED.to_string()],
        }
    }
}

/// What webhook reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReconciliation {
    /// No webhook existed; one was created.
    Created(Webhook),
    /// An existing webhook was repointed.
    Updated(Webhook),
}

impl WebhookReconciliation {
    /// Returns the resulting webhook.
    #[must_use]
    pub fn webhook(&self) -> &Webhook {
        match self {
            Self::Created(webhook) | Self::Updated(webhook) => webhook,
        }
    }
}

/// Page of webhooks returned by the list endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct WebhookPage {
    #[serde(default)]
    pub webhooks: Vec<Webhook>,
}

/// Error body returned by the provider.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}
