//! Persisted records: the active conversation and the phone bindings.

use crate::phone::PhoneNumber;
use crate::sid::{ConversationSid, ParticipantSid};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The single conversation every bound number is relayed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveConversation {
    /// Remote conversation identifier.
    pub id: ConversationSid,
}

impl ActiveConversation {
    /// Creates a record for a remote conversation.
    #[must_use]
    pub fn new(id: ConversationSid) -> Self {
        Self { id }
    }
}

/// Watchdog-relevant state of a binding, derived from its activity timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingState {
    /// Last activity is within the expiration budget.
    Active,
    /// Budget exceeded; the watchdog has not released it yet.
    ExpiredPendingRelease,
}

/// A phone number currently allowed to use the masked conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneBinding {
    /// Remote participant identifier; the record's storage key.
    pub participant_id: ParticipantSid,
    /// Conversation the participant belongs to.
    pub conversation_id: ConversationSid,
    /// The external number. Unique across bindings.
    pub number: PhoneNumber,
    /// When the number last sent a message (or was bound).
    pub last_activity_at: DateTime<Utc>,
    /// Inactivity budget in minutes.
    pub expiration_minutes: u32,
}

impl PhoneBinding {
    /// Creates a binding whose activity clock starts at `now`.
    #[must_use]
    pub fn new(
        participant_id: ParticipantSid,
        conversation_id: ConversationSid,
        number: PhoneNumber,
        expiration_minutes: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            participant_id,
            conversation_id,
            number,
            last_activity_at: now,
            expiration_minutes,
        }
    }

    /// Returns the inactivity budget as a duration.
    #[must_use]
    pub fn expiration(&self) -> Duration {
        Duration::minutes(i64::from(self.expiration_minutes))
    }

    /// Returns how long the number has been idle at `now`.
    #[must_use]
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_activity_at
    }

    /// Returns true if idle time strictly exceeds the expiration budget.
    #[must_use]
    pub fn is_inactive(&self, now: DateTime<Utc>) -> bool {
        self.idle_for(now) > self.expiration()
    }

    /// Returns the derived watchdog state at `now`.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> BindingState {
        if self.is_inactive(now) {
            BindingState::ExpiredPendingRelease
        } else {
            BindingState::Active
        }
    }

    /// Records activity at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Moves the binding to a new participant in another conversation.
    ///
    /// The activity timestamp is left as is.
    pub fn rebind(
        &mut self,
        participant_id: ParticipantSid,
        conversation_id: ConversationSid,
        expiration_minutes: u32,
    ) {
        self.participant_id = participant_id;
        self.conversation_id = conversation_id;
        self.expiration_minutes = expiration_minutes;
    }

    /// Returns true if the binding belongs to `conversation`.
    #[must_use]
    pub fn belongs_to(&self, conversation: &ConversationSid) -> bool {
        &self.conversation_id == conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(idle_minutes: i64, expiration_minutes: u32) -> (PhoneBinding, DateTime<Utc>) {
        let now = Utc::now();
        let binding = PhoneBinding::new(
            ParticipantSid::new("MBxxx"),
            ConversationSid::new("CHxxx"),
            PhoneNumber::parse("+15550001").expect("valid number"),
            expiration_minutes,
            now - Duration::minutes(idle_minutes),
        );
        (binding, now)
    }

    #[test]
    fn inactive_after_seven_minutes_with_five_minute_budget() {
        let (binding, now) = binding(7, 5);
        assert!(binding.is_inactive(now));
        assert_eq!(binding.state(now), BindingState::ExpiredPendingRelease);
    }

    #[test]
    fn active_after_four_minutes_with_five_minute_budget() {
        let (binding, now) = binding(4, 5);
        assert!(!binding.is_inactive(now));
        assert_eq!(binding.state(now), BindingState::Active);
    }

    #[test]
    fn exactly_at_budget_is_still_active() {
        let (binding, now) = binding(5, 5);
        assert!(!binding.is_inactive(now));
        assert!(binding.is_inactive(now + Duration::seconds(1)));
    }

    #[test]
    fn touch_resets_the_clock() {
        let (mut binding, now) = binding(30, 5);
        assert!(binding.is_inactive(now));
        binding.touch(now);
        assert!(!binding.is_inactive(now));
        assert_eq!(binding.last_activity_at, now);
    }

    #[test]
    fn rebind_replaces_ids_and_budget() {
        let (mut binding, _) = binding(0, 5);
        let before = binding.last_activity_at;
        binding.rebind(ParticipantSid::new("MBnew"), ConversationSid::new("CHnew"), 15);

        assert_eq!(binding.participant_id.as_str(), "MBnew");
        assert!(binding.belongs_to(&ConversationSid::new("CHnew")));
        assert_eq!(binding.expiration_minutes, 15);
        assert_eq!(binding.last_activity_at, before);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let (binding, _) = binding(0, 10);
        let json = serde_json::to_value(&binding).expect("serialize");

        assert_eq!(json["participantId"], "MBxxx");
        assert_eq!(json["conversationId"], "CHxxx");
        assert_eq!(json["number"], "+15550001");
        assert_eq!(json["expirationMinutes"], 10);
        assert!(json["lastActivityAt"].is_string());

        let parsed: PhoneBinding = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, binding);
    }

    #[test]
    fn parses_iso_8601_timestamp() {
        let json = serde_json::json!({
            "participantId": "PNxxx",
            "conversationId": "CHxxx",
            "number": "+1234567890",
            "lastActivityAt": "2020-01-09T22:09:32.579Z",
            "expirationMinutes": 10
        });
        let binding: PhoneBinding = serde_json::from_value(json).expect("deserialize");
        let expected: DateTime<Utc> = "2020-01-09T22:09:32.579Z".parse().expect("timestamp");
        assert_eq!(binding.last_activity_at, expected);
    }
}
