//! masked-sms web server.
//!
//! This crate provides the HTTP boundary of the proxy: the admin pages for
//! adding numbers, the provider's webhook endpoint, and the configuration
//! the binary is started with.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod views;
