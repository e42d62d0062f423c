//! JSON document store.
//!
//! The whole state lives in one document holding the active conversation
//! and the list of bindings. The document is kept in memory; with a backing
//! file, every mutation rewrites the file through a temp file and a rename so
//! a crash never leaves a half-written document behind.

use crate::error::StoreError;
use crate::repository::BindingStore;
use async_trait::async_trait;
use masked_sms_core::{ActiveConversation, ParticipantSid, PhoneBinding};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoreDocument {
    /// The active conversation singleton.
    #[serde(default)]
    pub conversation: Option<ActiveConversation>,
    /// Bound phone numbers.
    #[serde(default)]
    pub bindings: Vec<PhoneBinding>,
}

impl StoreDocument {
    fn position_by_id(&self, participant_id: &ParticipantSid) -> Option<usize> {
        self.bindings
            .iter()
            .position(|b| &b.participant_id == participant_id)
    }

    /// Fails if a record other than `except` already holds the number.
    fn check_number_free(
        &self,
        binding: &PhoneBinding,
        except: Option<usize>,
    ) -> Result<(), StoreError> {
        let taken = self
            .bindings
            .iter()
            .enumerate()
            .any(|(i, b)| Some(i) != except && b.number == binding.number);
        if taken {
            return Err(StoreError::DuplicateNumber {
                number: binding.number.to_string(),
            });
        }
        Ok(())
    }

    fn upsert(&mut self, binding: &PhoneBinding) -> Result<(), StoreError> {
        let existing = self.position_by_id(&binding.participant_id);
        self.check_number_free(binding, existing)?;
        match existing {
            Some(i) => self.bindings[i] = binding.clone(),
            None => self.bindings.push(binding.clone()),
        }
        Ok(())
    }

    fn replace(
        &mut self,
        previous: &ParticipantSid,
        binding: &PhoneBinding,
    ) -> Result<(), StoreError> {
        let existing = self
            .position_by_id(previous)
            .or_else(|| self.position_by_id(&binding.participant_id));
        self.check_number_free(binding, existing)?;
        match existing {
            Some(i) => self.bindings[i] = binding.clone(),
            None => self.bindings.push(binding.clone()),
        }
        Ok(())
    }
}

/// A [`BindingStore`] backed by a single JSON document.
#[derive(Debug)]
pub struct JsonStore {
    path: Option<PathBuf>,
    document: Mutex<StoreDocument>,
}

impl JsonStore {
    /// Opens a file-backed store, creating the file with an empty document
    /// if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a valid store
    /// document, or the initial document cannot be written.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, Report<StoreError>> {
        let path = path.into();
        let (document, created) = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                (StoreDocument::default(), true)
            }
            Ok(bytes) => {
                let document: StoreDocument =
                    serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                (document, false)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => (StoreDocument::default(), true),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                }
                .into());
            }
        };

        if created {
            write_document(&path, &document).await?;
            info!(path = %path.display(), "Initialized empty store document");
        }

        Ok(Self {
            path: Some(path),
            document: Mutex::new(document),
        })
    }

    /// Creates a store that keeps its document in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: Mutex::new(StoreDocument::default()),
        }
    }

    /// Applies a mutation and persists the result.
    ///
    /// The mutation runs on a copy; the in-memory document only changes once
    /// the write succeeded.
    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut StoreDocument) -> Result<T, StoreError>,
    ) -> Result<T, Report<StoreError>> {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        let value = apply(&mut next)?;
        if let Some(path) = &self.path {
            write_document(path, &next).await?;
        }
        *document = next;
        Ok(value)
    }
}

async fn write_document(path: &Path, document: &StoreDocument) -> Result<(), Report<StoreError>> {
    let io_error = |e: std::io::Error| StoreError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    let bytes = serde_json::to_vec_pretty(document).map_err(|e| StoreError::Serialize {
        reason: e.to_string(),
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await.map_err(io_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error)?;

    debug!(path = %path.display(), bytes = bytes.len(), "Store document written");
    Ok(())
}

#[async_trait]
impl BindingStore for JsonStore {
    async fn active_conversation(&self) -> Result<Option<ActiveConversation>, Report<StoreError>> {
        Ok(self.document.lock().await.conversation.clone())
    }

    async fn save_active_conversation(
        &self,
        conversation: &ActiveConversation,
    ) -> Result<(), Report<StoreError>> {
        self.mutate(|doc| {
            doc.conversation = Some(conversation.clone());
            Ok(())
        })
        .await
    }

    async fn find_binding_by_number(
        &self,
        number: &str,
    ) -> Result<Option<PhoneBinding>, Report<StoreError>> {
        let document = self.document.lock().await;
        Ok(document
            .bindings
            .iter()
            .find(|b| b.number.as_str() == number)
            .cloned())
    }

    async fn find_binding_by_id(
        &self,
        participant_id: &ParticipantSid,
    ) -> Result<Option<PhoneBinding>, Report<StoreError>> {
        let document = self.document.lock().await;
        Ok(document
            .bindings
            .iter()
            .find(|b| &b.participant_id == participant_id)
            .cloned())
    }

    async fn list_bindings(&self) -> Result<Vec<PhoneBinding>, Report<StoreError>> {
        Ok(self.document.lock().await.bindings.clone())
    }

    async fn save_binding(&self, binding: &PhoneBinding) -> Result<(), Report<StoreError>> {
        self.mutate(|doc| doc.upsert(binding)).await
    }

    async fn replace_binding(
        &self,
        previous: &ParticipantSid,
        binding: &PhoneBinding,
    ) -> Result<(), Report<StoreError>> {
        self.mutate(|doc| doc.replace(previous, binding)).await
    }

    async fn delete_binding(
        &self,
        participant_id: &ParticipantSid,
    ) -> Result<bool, Report<StoreError>> {
        self.mutate(|doc| {
            let before = doc.bindings.len();
            doc.bindings.retain(|b| &b.participant_id != participant_id);
            Ok(doc.bindings.len() != before)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use masked_sms_core::{ConversationSid, PhoneNumber};

    fn binding(participant: &str, number: &str) -> PhoneBinding {
        let at: DateTime<Utc> = "2020-01-09T22:09:32.579Z".parse().expect("timestamp");
        PhoneBinding::new(
            ParticipantSid::new(participant),
            ConversationSid::new("CHxxx"),
            PhoneNumber::parse(number).expect("valid number"),
            10,
            at,
        )
    }

    #[tokio::test]
    async fn missing_conversation_is_none() {
        let store = JsonStore::in_memory();
        assert_eq!(store.active_conversation().await.unwrap(), None);
    }

    #[tokio::test]
    async fn conversation_is_a_singleton() {
        let store = JsonStore::in_memory();
        store
            .save_active_conversation(&ActiveConversation::new(ConversationSid::new("CHold")))
            .await
            .unwrap();
        store
            .save_active_conversation(&ActiveConversation::new(ConversationSid::new("CHnew")))
            .await
            .unwrap();

        let conversation = store.active_conversation().await.unwrap().unwrap();
        assert_eq!(conversation.id.as_str(), "CHnew");
    }

    #[tokio::test]
    async fn saved_binding_reads_back_by_number() {
        let store = JsonStore::in_memory();
        let saved = binding("PNxxx", "+1234567890");
        store.save_binding(&saved).await.unwrap();

        let found = store.find_binding_by_number("+1234567890").await.unwrap();
        assert_eq!(found, Some(saved));
    }

    #[tokio::test]
    async fn find_by_id() {
        let store = JsonStore::in_memory();
        store.save_binding(&binding("PNxxx", "+12345")).await.unwrap();

        let found = store
            .find_binding_by_id(&ParticipantSid::new("PNxxx"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.conversation_id.as_str(), "CHxxx");
        assert!(
            store
                .find_binding_by_id(&ParticipantSid::new("PNother"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn save_overwrites_matching_participant() {
        let store = JsonStore::in_memory();
        let mut record = binding("MB1", "+12345");
        store.save_binding(&record).await.unwrap();

        record.expiration_minutes = 30;
        store.save_binding(&record).await.unwrap();

        let all = store.list_bindings().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].expiration_minutes, 30);
    }

    #[tokio::test]
    async fn second_binding_for_same_number_is_rejected() {
        let store = JsonStore::in_memory();
        store.save_binding(&binding("MB1", "+12345")).await.unwrap();

        let result = store.save_binding(&binding("MB2", "+12345")).await;
        assert!(result.is_err());
        assert_eq!(store.list_bindings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_keeps_position() {
        let store = JsonStore::in_memory();
        store.save_binding(&binding("MB1", "+1111")).await.unwrap();
        store.save_binding(&binding("MB2", "+2222")).await.unwrap();

        let mut moved = binding("MB1", "+1111");
        moved.rebind(ParticipantSid::new("MB9"), ConversationSid::new("CHnew"), 5);
        store
            .replace_binding(&ParticipantSid::new("MB1"), &moved)
            .await
            .unwrap();

        let all = store.list_bindings().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].participant_id.as_str(), "MB9");
        assert_eq!(all[0].conversation_id.as_str(), "CHnew");
        assert_eq!(all[1].participant_id.as_str(), "MB2");
    }

    #[tokio::test]
    async fn replace_inserts_when_nothing_matches() {
        let store = JsonStore::in_memory();
        store.save_binding(&binding("MB1", "+1111")).await.unwrap();

        let fresh = binding("MB7", "+7777");
        store
            .replace_binding(&ParticipantSid::new("MBgone"), &fresh)
            .await
            .unwrap();

        let all = store.list_bindings().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], fresh);
        assert_eq!(
            store.find_binding_by_number("+7777").await.unwrap(),
            Some(fresh)
        );
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_matched() {
        let store = JsonStore::in_memory();
        store.save_binding(&binding("MB1", "+1111")).await.unwrap();

        assert!(store.delete_binding(&ParticipantSid::new("MB1")).await.unwrap());
        assert!(!store.delete_binding(&ParticipantSid::new("MB1")).await.unwrap());
        assert!(store.list_bindings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let store = JsonStore::in_memory();
        for (i, number) in ["+1111", "+2222", "+3333"].iter().enumerate() {
            store
                .save_binding(&binding(&format!("MB{i}"), number))
                .await
                .unwrap();
        }

        let numbers: Vec<String> = store
            .list_bindings()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.number.to_string())
            .collect();
        assert_eq!(numbers, ["+1111", "+2222", "+3333"]);
    }

    #[tokio::test]
    async fn open_creates_file_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_data").join("db.json");

        JsonStore::open(&path).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw["conversation"].is_null());
        assert_eq!(raw["bindings"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let saved = binding("MB1", "+15550001");

        {
            let store = JsonStore::open(&path).await.unwrap();
            store
                .save_active_conversation(&ActiveConversation::new(ConversationSid::new("CHxxx")))
                .await
                .unwrap();
            store.save_binding(&saved).await.unwrap();
        }

        let reopened = JsonStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.active_conversation().await.unwrap(),
            Some(ActiveConversation::new(ConversationSid::new("CHxxx")))
        );
        assert_eq!(
            reopened.find_binding_by_number("+15550001").await.unwrap(),
            Some(saved)
        );
    }

    #[tokio::test]
    async fn empty_file_opens_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "").unwrap();

        let store = JsonStore::open(&path).await.unwrap();
        assert_eq!(store.active_conversation().await.unwrap(), None);
        assert!(store.list_bindings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(JsonStore::open(&path).await.is_err());
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonStore::open(&path).await.unwrap();

        // A directory where the temp file should go makes the write fail.
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::create_dir(PathBuf::from(tmp)).unwrap();

        let result = store.save_binding(&binding("MB1", "+1111")).await;
        assert!(result.is_err());
        assert!(store.list_bindings().await.unwrap().is_empty());
    }
}
