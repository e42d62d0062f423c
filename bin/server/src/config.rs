//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested
//! sections use `__` as the separator, e.g. `TWILIO__ACCOUNT_SID`.
//!
//! See [`TwilioConfig`](masked_sms_provider::TwilioConfig) for the provider
//! settings.

use masked_sms_conversation::DEFAULT_FRIENDLY_NAME;
use masked_sms_provider::TwilioConfig;
use masked_sms_watchdog::DEFAULT_EXPIRED_MESSAGE;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Text sent to a number when its session starts.
pub const DEFAULT_WELCOME_MESSAGE: &str = "Conversation session began. Write some message.";

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Location of the JSON document store.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Twilio credentials and endpoints.
    pub twilio: TwilioConfig,

    /// Conversation texts.
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Inactivity watchdog settings.
    #[serde(default)]
    pub watchdog: WatchdogConfig,
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_data_path() -> PathBuf {
    PathBuf::from("_data/db.json")
}

/// Conversation-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationConfig {
    /// Friendly name of conversations created by the service.
    #[serde(default = "default_friendly_name")]
    pub friendly_name: String,

    /// Message sent to a number once it has been bound.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

fn default_friendly_name() -> String {
    DEFAULT_FRIENDLY_NAME.to_string()
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            friendly_name: default_friendly_name(),
            welcome_message: default_welcome_message(),
        }
    }
}

/// Watchdog-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchdogConfig {
    /// Pause between the end of one sweep and the start of the next, in
    /// seconds.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,

    /// Message sent to a number whose session expired.
    #[serde(default = "default_expired_message")]
    pub expired_message: String,
}

fn default_interval_seconds() -> u64 {
    10
}

fn default_expired_message() -> String {
    DEFAULT_EXPIRED_MESSAGE.to_string()
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval_seconds(),
            expired_message: default_expired_message(),
        }
    }
}

impl WatchdogConfig {
    /// Returns the sweep interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Values are kept as strings until deserialized so that phone numbers
    /// keep their leading `+`.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_builder(
            config::Config::builder().add_source(config::Environment::default().separator("__")),
        )
    }

    /// Builds configuration from an already populated builder.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }
}
