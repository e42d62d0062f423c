//! Twilio gateway configuration.

use serde::Deserialize;

/// Connection settings for the Twilio APIs.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
    /// Account SID, used as the basic-auth user.
    pub account_sid: String,

    /// Auth token, used as the basic-auth password.
    pub auth_token: String,

    /// The masking number every participant is proxied through.
    pub phone_number: String,

    /// Base URL of the Conversations API.
    #[serde(default = "default_conversations_base_url")]
    pub conversations_base_url: String,

    /// Base URL of the core REST API (used for outbound SMS).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_conversations_base_url() -> String {
    "https://conversations.twilio.com/v1".to_string()
}

fn default_api_base_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    10
}

impl TwilioConfig {
    /// Creates a configuration with default endpoints.
    #[must_use]
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            phone_number: phone_number.into(),
            conversations_base_url: default_conversations_base_url(),
            api_base_url: default_api_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }

    /// Points both APIs at one base URL (useful against a local mock).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.conversations_base_url = base_url.clone();
        self.api_base_url = base_url;
        self
    }
}
