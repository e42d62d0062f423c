//! Orchestration of the active conversation and its phone bindings.

use crate::context::ConversationContext;
use crate::error::ConversationError;
use chrono::{DateTime, Utc};
use masked_sms_core::{ActiveConversation, PhoneBinding, PhoneNumber};
use masked_sms_provider::{ConversationsGateway, SentMessage};
use masked_sms_store::BindingStore;
use rootcause::Report;
use rootcause::prelude::ResultExt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Friendly name given to conversations created by this service.
pub const DEFAULT_FRIENDLY_NAME: &str = "2 Way Masked SMS";

/// Result of binding a number to the active conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The number was unknown and is now bound.
    Created(PhoneBinding),
    /// The number was bound to an older conversation and has been moved.
    Rebound(PhoneBinding),
    /// The number is already bound to this conversation. Nothing changed.
    AlreadyActive(PhoneBinding),
}

impl BindOutcome {
    /// Returns the binding as it now stands.
    #[must_use]
    pub fn binding(&self) -> &PhoneBinding {
        match self {
            Self::Created(binding) | Self::Rebound(binding) | Self::AlreadyActive(binding) => {
                binding
            }
        }
    }

    /// Returns true if this call created or moved the binding.
    #[must_use]
    pub fn is_new_session(&self) -> bool {
        !matches!(self, Self::AlreadyActive(_))
    }
}

/// Coordinates the store and the provider gateway.
pub struct ConversationService {
    store: Arc<dyn BindingStore>,
    gateway: Arc<dyn ConversationsGateway>,
    context: ConversationContext,
    friendly_name: String,
}

impl ConversationService {
    /// Creates a service with an empty resolution context.
    #[must_use]
    pub fn new(
        store: Arc<dyn BindingStore>,
        gateway: Arc<dyn ConversationsGateway>,
        friendly_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateway,
            context: ConversationContext::new(),
            friendly_name: friendly_name.into(),
        }
    }

    /// Returns the resolution context.
    #[must_use]
    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Returns the conversation all numbers are bound to, creating it if
    /// needed.
    ///
    /// The first resolution in a process also points the conversation's
    /// webhook at `callback_base_url`. Later calls return the cached record
    /// without contacting the store or the provider.
    #[instrument(skip(self))]
    pub async fn get_or_create_conversation(
        &self,
        callback_base_url: &str,
    ) -> Result<ActiveConversation, Report<ConversationError>> {
        let mut resolved = self.context.lock().await;
        if let Some(conversation) = resolved.as_ref() {
            return Ok(conversation.clone());
        }

        let stored = self
            .store
            .active_conversation()
            .await
            .context(ConversationError::Resolve)?;

        let existing = match stored {
            Some(record) => {
                let remote = self
                    .gateway
                    .fetch_conversation(&record.id)
                    .await
                    .context(ConversationError::Resolve)?;
                if remote.is_none() {
                    warn!(conversation = %record.id, "Stored conversation no longer exists remotely");
                }
                remote.map(|_| record)
            }
            None => None,
        };

        let conversation = match existing {
            Some(record) => record,
            None => {
                let created = self
                    .gateway
                    .create_conversation(&self.friendly_name)
                    .await
                    .context(ConversationError::Resolve)?;
                let record = ActiveConversation::new(created.sid);
                self.store
                    .save_active_conversation(&record)
                    .await
                    .context(ConversationError::Resolve)?;
                info!(conversation = %record.id, "Created conversation");
                record
            }
        };

        let webhooks = self
            .gateway
            .list_webhooks(&conversation.id)
            .await
            .context(ConversationError::Resolve)?;
        self.gateway
            .reconcile_webhook(&conversation.id, &webhooks, callback_base_url)
            .await
            .context(ConversationError::Resolve)?;

        *resolved = Some(conversation.clone());
        Ok(conversation)
    }

    /// Binds `number` to `conversation`.
    #[instrument(skip(self, conversation), fields(conversation = %conversation.id, number = %number))]
    pub async fn bind_number(
        &self,
        conversation: &ActiveConversation,
        number: &PhoneNumber,
        expiration_minutes: u32,
    ) -> Result<BindOutcome, Report<ConversationError>> {
        let context = || ConversationError::Bind {
            number: number.to_string(),
        };

        let existing = self
            .store
            .find_binding_by_number(number.as_str())
            .await
            .context(context())?;

        match existing {
            None => {
                let participant = self
                    .gateway
                    .add_participant(&conversation.id, number)
                    .await
                    .context(context())?;
                let binding = PhoneBinding::new(
                    participant.sid,
                    conversation.id.clone(),
                    number.clone(),
                    expiration_minutes,
                    Utc::now(),
                );
                self.store.save_binding(&binding).await.context(context())?;
                info!(participant = %binding.participant_id, "Bound number");
                Ok(BindOutcome::Created(binding))
            }
            Some(binding) if binding.belongs_to(&conversation.id) => {
                debug!("Number is already bound to this conversation");
                Ok(BindOutcome::AlreadyActive(binding))
            }
            Some(mut binding) => {
                let previous = binding.participant_id.clone();
                let removed = self
                    .gateway
                    .remove_participant(&binding.conversation_id, &previous)
                    .await
                    .context(context())?;
                if !removed {
                    debug!(participant = %previous, "Stale participant was already gone");
                }

                let participant = self
                    .gateway
                    .add_participant(&conversation.id, number)
                    .await
                    .context(context())?;
                binding.rebind(participant.sid, conversation.id.clone(), expiration_minutes);
                self.store
                    .replace_binding(&previous, &binding)
                    .await
                    .context(context())?;
                info!(
                    previous = %previous,
                    participant = %binding.participant_id,
                    "Moved number to the active conversation"
                );
                Ok(BindOutcome::Rebound(binding))
            }
        }
    }

    /// Removes the binding's remote participant. The stored record is left
    /// alone.
    #[instrument(skip(self, binding), fields(participant = %binding.participant_id))]
    pub async fn unbind_number(
        &self,
        binding: &PhoneBinding,
    ) -> Result<bool, Report<ConversationError>> {
        self.gateway
            .remove_participant(&binding.conversation_id, &binding.participant_id)
            .await
            .context(ConversationError::Unbind {
                participant: binding.participant_id.clone(),
            })
    }

    /// Sends `text` to the bound number.
    #[instrument(skip(self, binding, text), fields(number = %binding.number))]
    pub async fn notify(
        &self,
        binding: &PhoneBinding,
        text: &str,
    ) -> Result<SentMessage, Report<ConversationError>> {
        self.gateway
            .send_message(&binding.number, text)
            .await
            .context(ConversationError::Notify {
                number: binding.number.to_string(),
            })
    }

    /// Stamps inbound activity on the binding for `number`.
    ///
    /// Returns `None` when no binding matches.
    #[instrument(skip(self))]
    pub async fn record_activity(
        &self,
        number: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PhoneBinding>, Report<ConversationError>> {
        let context = || ConversationError::RecordActivity {
            number: number.to_string(),
        };

        let Some(mut binding) = self
            .store
            .find_binding_by_number(number)
            .await
            .context(context())?
        else {
            debug!("Activity from an unbound number");
            return Ok(None);
        };

        binding.touch(now);
        self.store.save_binding(&binding).await.context(context())?;
        Ok(Some(binding))
    }

    /// Lists every binding.
    pub async fn list_bindings(&self) -> Result<Vec<PhoneBinding>, Report<ConversationError>> {
        self.store
            .list_bindings()
            .await
            .context(ConversationError::ListBindings)
    }
}
