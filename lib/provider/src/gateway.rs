//! Gateway trait over the provider's conversations API.
//!
//! One method per remote capability. Implementations perform no retries. A
//! missing resource is reported as `None` on fetch and `false` on removal;
//! every other failure propagates to the caller unchanged.

use crate::error::ProviderError;
use crate::types::{
    Conversation, Participant, SentMessage, Webhook, WebhookReconciliation, WebhookSubscription,
};
use async_trait::async_trait;
use masked_sms_core::{ConversationSid, ParticipantSid, PhoneNumber, WebhookSid};
use rootcause::Report;
use tracing::debug;

/// Trait for the remote conversations service.
#[async_trait]
pub trait ConversationsGateway: Send + Sync {
    /// Creates a conversation.
    async fn create_conversation(
        &self,
        friendly_name: &str,
    ) -> Result<Conversation, Report<ProviderError>>;

    /// Fetches a conversation. A missing conversation is `Ok(None)`.
    async fn fetch_conversation(
        &self,
        sid: &ConversationSid,
    ) -> Result<Option<Conversation>, Report<ProviderError>>;

    /// Removes a conversation. Returns `false` if it was already gone.
    async fn remove_conversation(
        &self,
        sid: &ConversationSid,
    ) -> Result<bool, Report<ProviderError>>;

    /// Lists the webhooks of a conversation.
    async fn list_webhooks(
        &self,
        sid: &ConversationSid,
    ) -> Result<Vec<Webhook>, Report<ProviderError>>;

    /// Creates a webhook on a conversation.
    async fn create_webhook(
        &self,
        sid: &ConversationSid,
        subscription: &WebhookSubscription,
    ) -> Result<Webhook, Report<ProviderError>>;

    /// Repoints an existing webhook.
    async fn update_webhook(
        &self,
        sid: &ConversationSid,
        webhook: &WebhookSid,
        subscription: &WebhookSubscription,
    ) -> Result<Webhook, Report<ProviderError>>;

    /// Adds an SMS participant proxied through the masking number.
    async fn add_participant(
        &self,
        sid: &ConversationSid,
        number: &PhoneNumber,
    ) -> Result<Participant, Report<ProviderError>>;

    /// Removes a participant. Returns `false` if it was already gone.
    async fn remove_participant(
        &self,
        sid: &ConversationSid,
        participant: &ParticipantSid,
    ) -> Result<bool, Report<ProviderError>>;

    /// Sends an SMS from the masking number.
    async fn send_message(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<SentMessage, Report<ProviderError>>;

    /// Points the conversation's webhook at `callback_base_url`.
    ///
    /// Updates the first of `existing` in place, or creates a webhook when
    /// there is none. Exactly one remote call is made.
    async fn reconcile_webhook(
        &self,
        sid: &ConversationSid,
        existing: &[Webhook],
        callback_base_url: &str,
    ) -> Result<WebhookReconciliation, Report<ProviderError>> {
        let subscription = WebhookSubscription::message_added(callback_base_url);
        match existing.first() {
            Some(current) => {
                debug!(
                    conversation = %sid,
                    webhook = %current.sid,
                    url = %subscription.url,
                    "Updating conversation webhook"
                );
                let webhook = self
                    .update_webhook(sid, &current.sid, &subscription)
                    .await?;
                Ok(WebhookReconciliation::Updated(webhook))
            }
            None => {
                debug!(conversation = %sid, url = %subscription.url, "Creating conversation webhook");
                let webhook = self.create_webhook(sid, &subscription).await?;
                Ok(WebhookReconciliation::Created(webhook))
            }
        }
    }
}
