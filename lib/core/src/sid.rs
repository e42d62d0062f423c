//! Strongly-typed identifiers for remote provider resources.
//!
//! The provider assigns every resource a string identifier ("sid") with a
//! two-letter prefix naming the resource kind. The values are opaque to this
//! system: the wrappers only keep conversation, participant, webhook and
//! message identifiers from being mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate a strongly-typed wrapper around a remote sid.
macro_rules! define_sid {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a sid returned by the provider.
            #[must_use]
            pub fn new(sid: impl Into<String>) -> Self {
                Self(sid.into())
            }

            /// Returns the sid as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the prefix the provider uses for this resource kind.
            #[must_use]
            pub const fn prefix() -> &'static str {
                $prefix
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(sid: String) -> Self {
                Self(sid)
            }
        }

        impl From<&str> for $name {
            fn from(sid: &str) -> Self {
                Self(sid.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_sid!(
    /// Identifier of a remote conversation.
    ConversationSid,
    "CH"
);

define_sid!(
    /// Identifier of a participant within a remote conversation.
    ParticipantSid,
    "MB"
);

define_sid!(
    /// Identifier of a conversation-scoped webhook subscription.
    WebhookSid,
    "WH"
);

define_sid!(
    /// Identifier of an outbound SMS message.
    MessageSid,
    "SM"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_sid() {
        let sid = ConversationSid::new("CHxxx");
        assert_eq!(sid.to_string(), "CHxxx");
    }

    #[test]
    fn prefixes_per_resource_kind() {
        assert_eq!(ConversationSid::prefix(), "CH");
        assert_eq!(ParticipantSid::prefix(), "MB");
        assert_eq!(WebhookSid::prefix(), "WH");
    }

    #[test]
    fn opaque_values_are_accepted() {
        let sid: MessageSid = "whatever".into();
        assert_eq!(sid.as_str(), "whatever");
    }

    #[test]
    fn sid_serde_is_transparent() {
        let sid = ConversationSid::new("CHabc");
        let json = serde_json::to_string(&sid).expect("serialize");
        assert_eq!(json, "\"CHabc\"");
        let parsed: ConversationSid = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, sid);
    }
}
