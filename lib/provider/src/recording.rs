//! In-memory gateway that records every call.
//!
//! Keeps just enough remote state (conversations, their webhooks and live
//! participants) for orchestration code to be exercised without a network.
//! Any call kind can be told to fail.

use crate::error::ProviderError;
use crate::gateway::ConversationsGateway;
use crate::types::{
    Conversation, Participant, SentMessage, Webhook, WebhookConfiguration, WebhookSubscription,
};
use async_trait::async_trait;
use masked_sms_core::{ConversationSid, MessageSid, ParticipantSid, PhoneNumber, WebhookSid};
use rootcause::Report;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// The gateway operation a call was made to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    CreateConversation,
    FetchConversation,
    RemoveConversation,
    ListWebhooks,
    CreateWebhook,
    UpdateWebhook,
    AddParticipant,
    RemoveParticipant,
    SendMessage,
}

impl CallKind {
    fn operation(self) -> &'static str {
        match self {
            Self::CreateConversation => "create_conversation",
            Self::FetchConversation => "fetch_conversation",
            Self::RemoveConversation => "remove_conversation",
            Self::ListWebhooks => "list_webhooks",
            Self::CreateWebhook => "create_webhook",
            Self::UpdateWebhook => "update_webhook",
            Self::AddParticipant => "add_participant",
            Self::RemoveParticipant => "remove_participant",
            Self::SendMessage => "send_message",
        }
    }
}

/// A call made against the gateway, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    CreateConversation {
        friendly_name: String,
    },
    FetchConversation {
        sid: ConversationSid,
    },
    RemoveConversation {
        sid: ConversationSid,
    },
    ListWebhooks {
        sid: ConversationSid,
    },
    CreateWebhook {
        sid: ConversationSid,
        url: String,
    },
    UpdateWebhook {
        sid: ConversationSid,
        webhook: WebhookSid,
        url: String,
    },
    AddParticipant {
        sid: ConversationSid,
        number: PhoneNumber,
    },
    RemoveParticipant {
        sid: ConversationSid,
        participant: ParticipantSid,
    },
    SendMessage {
        to: PhoneNumber,
        body: String,
    },
}

impl RecordedCall {
    /// Returns the kind of this call.
    #[must_use]
    pub fn kind(&self) -> CallKind {
        match self {
            Self::CreateConversation { .. } => CallKind::CreateConversation,
            Self::FetchConversation { .. } => CallKind::FetchConversation,
            Self::RemoveConversation { .. } => CallKind::RemoveConversation,
            Self::ListWebhooks { .. } => CallKind::ListWebhooks,
            Self::CreateWebhook { .. } => CallKind::CreateWebhook,
            Self::UpdateWebhook { .. } => CallKind::UpdateWebhook,
            Self::AddParticipant { .. } => CallKind::AddParticipant,
            Self::RemoveParticipant { .. } => CallKind::RemoveParticipant,
            Self::SendMessage { .. } => CallKind::SendMessage,
        }
    }
}

#[derive(Debug)]
struct LiveParticipant {
    conversation: ConversationSid,
    number: PhoneNumber,
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<RecordedCall>,
    conversations: HashMap<ConversationSid, Vec<Webhook>>,
    participants: HashMap<ParticipantSid, LiveParticipant>,
    failing: HashSet<CallKind>,
    next_id: u64,
}

impl RecordingState {
    fn next_sid(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{:032}", self.next_id)
    }

    /// Logs the call and returns an error if its kind is set to fail.
    fn record(&mut self, call: RecordedCall) -> Result<(), Report<ProviderError>> {
        let kind = call.kind();
        self.calls.push(call);
        if self.failing.contains(&kind) {
            return Err(ProviderError::Injected {
                operation: kind.operation().to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn webhooks_mut(
        &mut self,
        sid: &ConversationSid,
    ) -> Result<&mut Vec<Webhook>, Report<ProviderError>> {
        self.conversations
            .get_mut(sid)
            .ok_or_else(|| not_found(&format!("conversation {sid}")).into())
    }
}

fn not_found(resource: &str) -> ProviderError {
    ProviderError::Api {
        status: 404,
        code: Some(20404),
        message: format!("{resource} was not found"),
    }
}

fn webhook_from(sid: WebhookSid, subscription: &WebhookSubscription) -> Webhook {
    Webhook {
        sid,
        target: Some("webhook".to_string()),
        configuration: WebhookConfiguration {
            url: Some(subscription.url.clone()),
            method: Some(subscription.method.clone()),
            filters: subscription.filters.clone(),
        },
    }
}

/// Gateway double backed by in-memory state.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    state: Mutex<RecordingState>,
}

impl RecordingGateway {
    /// Creates an empty gateway with no remote conversations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a remote conversation with the given webhooks.
    pub async fn seed_conversation(&self, sid: ConversationSid, webhooks: Vec<Webhook>) {
        self.state.lock().await.conversations.insert(sid, webhooks);
    }

    /// Seeds a live participant, as if it had been added earlier.
    pub async fn seed_participant(
        &self,
        conversation: ConversationSid,
        participant: ParticipantSid,
        number: PhoneNumber,
    ) {
        self.state.lock().await.participants.insert(
            participant,
            LiveParticipant {
                conversation,
                number,
            },
        );
    }

    /// Makes every later call of `kind` fail.
    pub async fn fail(&self, kind: CallKind) {
        self.state.lock().await.failing.insert(kind);
    }

    /// Stops failing calls of `kind`.
    pub async fn recover(&self, kind: CallKind) {
        self.state.lock().await.failing.remove(&kind);
    }

    /// Returns every call made so far, in order.
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().await.calls.clone()
    }

    /// Returns how many calls of `kind` were made.
    pub async fn count(&self, kind: CallKind) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| call.kind() == kind)
            .count()
    }

    /// Forgets recorded calls, keeping remote state.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Returns true if the conversation exists remotely.
    pub async fn has_conversation(&self, sid: &ConversationSid) -> bool {
        self.state.lock().await.conversations.contains_key(sid)
    }

    /// Returns the webhooks of a remote conversation.
    pub async fn webhooks(&self, sid: &ConversationSid) -> Vec<Webhook> {
        self.state
            .lock()
            .await
            .conversations
            .get(sid)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the numbers currently joined to a conversation.
    pub async fn live_numbers(&self, sid: &ConversationSid) -> Vec<PhoneNumber> {
        let state = self.state.lock().await;
        let mut numbers: Vec<PhoneNumber> = state
            .participants
            .values()
            .filter(|p| &p.conversation == sid)
            .map(|p| p.number.clone())
            .collect();
        numbers.sort();
        numbers
    }

    /// Returns the messages sent so far as `(to, body)` pairs.
    pub async fn sent_messages(&self) -> Vec<(PhoneNumber, String)> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|call| match call {
                RecordedCall::SendMessage { to, body } => Some((to.clone(), body.clone())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ConversationsGateway for RecordingGateway {
    async fn create_conversation(
        &self,
        friendly_name: &str,
    ) -> Result<Conversation, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::CreateConversation {
            friendly_name: friendly_name.to_string(),
        })?;
        let sid = ConversationSid::new(state.next_sid(ConversationSid::prefix()));
        state.conversations.insert(sid.clone(), Vec::new());
        Ok(Conversation {
            sid,
            friendly_name: Some(friendly_name.to_string()),
            state: Some("active".to_string()),
        })
    }

    async fn fetch_conversation(
        &self,
        sid: &ConversationSid,
    ) -> Result<Option<Conversation>, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::FetchConversation { sid: sid.clone() })?;
        Ok(state
            .conversations
            .contains_key(sid)
            .then(|| Conversation {
                sid: sid.clone(),
                friendly_name: None,
                state: Some("active".to_string()),
            }))
    }

    async fn remove_conversation(
        &self,
        sid: &ConversationSid,
    ) -> Result<bool, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::RemoveConversation { sid: sid.clone() })?;
        if state.conversations.remove(sid).is_none() {
            return Ok(false);
        }
        state.participants.retain(|_, p| &p.conversation != sid);
        Ok(true)
    }

    async fn list_webhooks(
        &self,
        sid: &ConversationSid,
    ) -> Result<Vec<Webhook>, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::ListWebhooks { sid: sid.clone() })?;
        Ok(state.webhooks_mut(sid)?.clone())
    }

    async fn create_webhook(
        &self,
        sid: &ConversationSid,
        subscription: &WebhookSubscription,
    ) -> Result<Webhook, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::CreateWebhook {
            sid: sid.clone(),
            url: subscription.url.clone(),
        })?;
        let webhook_sid = WebhookSid::new(state.next_sid(WebhookSid::prefix()));
        let webhook = webhook_from(webhook_sid, subscription);
        state.webhooks_mut(sid)?.push(webhook.clone());
        Ok(webhook)
    }

    async fn update_webhook(
        &self,
        sid: &ConversationSid,
        webhook: &WebhookSid,
        subscription: &WebhookSubscription,
    ) -> Result<Webhook, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::UpdateWebhook {
            sid: sid.clone(),
            webhook: webhook.clone(),
            url: subscription.url.clone(),
        })?;
        let existing = state
            .webhooks_mut(sid)?
            .iter_mut()
            .find(|w| &w.sid == webhook)
            .ok_or_else(|| not_found(&format!("webhook {webhook}")))?;
        *existing = webhook_from(webhook.clone(), subscription);
        Ok(existing.clone())
    }

    async fn add_participant(
        &self,
        sid: &ConversationSid,
        number: &PhoneNumber,
    ) -> Result<Participant, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::AddParticipant {
            sid: sid.clone(),
            number: number.clone(),
        })?;
        state.webhooks_mut(sid)?;
        if state
            .participants
            .values()
            .any(|p| &p.conversation == sid && &p.number == number)
        {
            return Err(ProviderError::Api {
                status: 409,
                code: Some(50416),
                message: format!("participant {number} already exists"),
            }
            .into());
        }
        let participant = ParticipantSid::new(state.next_sid(ParticipantSid::prefix()));
        state.participants.insert(
            participant.clone(),
            LiveParticipant {
                conversation: sid.clone(),
                number: number.clone(),
            },
        );
        Ok(Participant {
            sid: participant,
            conversation_sid: Some(sid.clone()),
        })
    }

    async fn remove_participant(
        &self,
        sid: &ConversationSid,
        participant: &ParticipantSid,
    ) -> Result<bool, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::RemoveParticipant {
            sid: sid.clone(),
            participant: participant.clone(),
        })?;
        match state.participants.get(participant) {
            Some(live) if &live.conversation == sid => {
                state.participants.remove(participant);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn send_message(
        &self,
        to: &PhoneNumber,
        body: &str,
    ) -> Result<SentMessage, Report<ProviderError>> {
        let mut state = self.state.lock().await;
        state.record(RecordedCall::SendMessage {
            to: to.clone(),
            body: body.to_string(),
        })?;
        Ok(SentMessage {
            sid: MessageSid::new(state.next_sid(MessageSid::prefix())),
            status: Some("queued".to_string()),
        })
    }
}
