//! Persistence for masked-sms.
//!
//! This crate provides:
//!
//! - **BindingStore**: the repository trait over the active conversation and
//!   the phone bindings
//! - **JsonStore**: a JSON-document implementation, file backed or in memory

pub mod error;
pub mod json;
pub mod repository;

pub use error::StoreError;
pub use json::JsonStore;
pub use repository::BindingStore;
