//! Error types for the watchdog crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `WatchdogError`: A sweep could not run at all
//! - `ReleaseFailure`: One binding could not be released; the sweep goes on

use std::fmt;

/// Errors that abort a whole sweep cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogError {
    /// The bindings could not be listed.
    ListBindings,
}

impl fmt::Display for WatchdogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ListBindings => write!(f, "failed to list bindings for the sweep"),
        }
    }
}

impl std::error::Error for WatchdogError {}

/// The step of a release that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseStep {
    /// Sending the expiry message.
    Notify,
    /// Removing the remote participant.
    Unbind,
    /// Deleting the stored binding.
    Delete,
}

impl fmt::Display for ReleaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notify => write!(f, "notify"),
            Self::Unbind => write!(f, "unbind"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Why a single binding was not released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
    pub step: ReleaseStep,
    pub reason: String,
}

impl fmt::Display for ReleaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "release failed at {}: {}", self.step, self.reason)
    }
}

impl std::error::Error for ReleaseFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_failure_names_step() {
        let failure = ReleaseFailure {
            step: ReleaseStep::Unbind,
            reason: "provider returned 500".to_string(),
        };
        assert!(failure.to_string().contains("unbind"));
        assert!(failure.to_string().contains("500"));
    }
}
