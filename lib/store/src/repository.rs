//! Repository trait for the persisted records.

use crate::error::StoreError;
use async_trait::async_trait;
use masked_sms_core::{ActiveConversation, ParticipantSid, PhoneBinding};
use rootcause::Report;

/// Storage for the active conversation and the phone bindings.
///
/// Every call is an independent read or read-modify-write. Callers must not
/// assume atomicity across calls.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Returns the persisted active conversation, if any.
    async fn active_conversation(&self) -> Result<Option<ActiveConversation>, Report<StoreError>>;

    /// Persists the active conversation, replacing any previous record.
    async fn save_active_conversation(
        &self,
        conversation: &ActiveConversation,
    ) -> Result<(), Report<StoreError>>;

    /// Finds the binding for an external number.
    async fn find_binding_by_number(
        &self,
        number: &str,
    ) -> Result<Option<PhoneBinding>, Report<StoreError>>;

    /// Finds a binding by its participant identifier.
    async fn find_binding_by_id(
        &self,
        participant_id: &ParticipantSid,
    ) -> Result<Option<PhoneBinding>, Report<StoreError>>;

    /// Lists all bindings in insertion order.
    async fn list_bindings(&self) -> Result<Vec<PhoneBinding>, Report<StoreError>>;

    /// Inserts a binding whose participant is unseen, otherwise overwrites
    /// the record with the same participant identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateNumber`] when inserting would create a
    /// second binding for the same number.
    async fn save_binding(&self, binding: &PhoneBinding) -> Result<(), Report<StoreError>>;

    /// Overwrites the record currently stored under `previous` in place.
    ///
    /// Used when a number moves to a new participant so the record keeps its
    /// position instead of being duplicated. Inserts when nothing matches.
    async fn replace_binding(
        &self,
        previous: &ParticipantSid,
        binding: &PhoneBinding,
    ) -> Result<(), Report<StoreError>>;

    /// Deletes a binding. Returns false if no record matched.
    async fn delete_binding(
        &self,
        participant_id: &ParticipantSid,
    ) -> Result<bool, Report<StoreError>>;
}
