//! Inactivity watchdog for masked-sms.
//!
//! This crate provides:
//!
//! - **Sweep**: one pass that notifies, unbinds and deletes inactive bindings
//! - **Schedule**: a fixed-delay loop driving sweeps until cancelled

pub mod error;
pub mod schedule;
pub mod sweep;

pub use error::{ReleaseFailure, ReleaseStep, WatchdogError};
pub use schedule::{DEFAULT_INTERVAL, FixedDelay, Sweep};
pub use sweep::{DEFAULT_EXPIRED_MESSAGE, InactivityWatchdog, ReleaseOutcome, SweepReport};
