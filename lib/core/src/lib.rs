//! Core domain types and utilities for masked-sms.
//!
//! This crate provides the foundational types, error handling, and shared
//! records used by the store, the provider gateway, the conversation
//! orchestrator and the inactivity watchdog.

pub mod error;
pub mod model;
pub mod phone;
pub mod sid;

pub use error::{ParsePhoneNumberError, Result};
pub use model::{ActiveConversation, BindingState, PhoneBinding};
pub use phone::PhoneNumber;
pub use sid::{ConversationSid, MessageSid, ParticipantSid, WebhookSid};
