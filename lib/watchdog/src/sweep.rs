//! One pass over the bindings, releasing the inactive ones.

use crate::error::{ReleaseFailure, ReleaseStep, WatchdogError};
use crate::schedule::Sweep;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use masked_sms_conversation::ConversationService;
use masked_sms_core::PhoneBinding;
use masked_sms_store::BindingStore;
use rootcause::Report;
use rootcause::prelude::ResultExt;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Text sent to a number whose binding expired.
pub const DEFAULT_EXPIRED_MESSAGE: &str = "This session expired!";

/// What happened to one expired binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub binding: PhoneBinding,
    pub result: Result<(), ReleaseFailure>,
}

/// Result of one sweep cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Bindings looked at.
    pub examined: usize,
    /// Bindings found inactive.
    pub expired: usize,
    /// One entry per expired binding, in processing order.
    pub outcomes: Vec<ReleaseOutcome>,
}

impl SweepReport {
    /// Bindings fully released this cycle.
    pub fn released(&self) -> impl Iterator<Item = &PhoneBinding> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_ok())
            .map(|outcome| &outcome.binding)
    }

    /// Bindings that will be retried next cycle, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&PhoneBinding, &ReleaseFailure)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.result {
                Ok(()) => None,
                Err(failure) => Some((&outcome.binding, failure)),
            })
    }
}

/// Expires bindings that have been idle past their budget.
///
/// Each expired binding is notified, unbound remotely and then deleted. The
/// first failing step stops that binding, which keeps its record and is
/// retried on the next cycle.
pub struct InactivityWatchdog {
    service: Arc<ConversationService>,
    store: Arc<dyn BindingStore>,
    expired_message: String,
}

impl InactivityWatchdog {
    #[must_use]
    pub fn new(
        service: Arc<ConversationService>,
        store: Arc<dyn BindingStore>,
        expired_message: impl Into<String>,
    ) -> Self {
        Self {
            service,
            store,
            expired_message: expired_message.into(),
        }
    }

    /// Runs one sweep as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bindings cannot be listed. Failures on
    /// individual bindings are reported in the [`SweepReport`].
    #[instrument(skip(self))]
    pub async fn run_cycle(
        &self,
        now: DateTime<Utc>,
    ) -> Result<SweepReport, Report<WatchdogError>> {
        let bindings = self
            .service
            .list_bindings()
            .await
            .context(WatchdogError::ListBindings)?;

        let mut report = SweepReport {
            examined: bindings.len(),
            ..SweepReport::default()
        };

        for binding in bindings.into_iter().filter(|b| b.is_inactive(now)) {
            report.expired += 1;
            let result = self.release(&binding).await;
            match &result {
                Ok(()) => info!(number = %binding.number, "Released inactive number"),
                Err(failure) => warn!(
                    number = %binding.number,
                    step = %failure.step,
                    error = %failure.reason,
                    "Failed to release inactive number"
                ),
            }
            report.outcomes.push(ReleaseOutcome { binding, result });
        }

        Ok(report)
    }

    async fn release(&self, binding: &PhoneBinding) -> Result<(), ReleaseFailure> {
        self.service
            .notify(binding, &self.expired_message)
            .await
            .map_err(|e| ReleaseFailure {
                step: ReleaseStep::Notify,
                reason: e.to_string(),
            })?;

        self.service
            .unbind_number(binding)
            .await
            .map_err(|e| ReleaseFailure {
                step: ReleaseStep::Unbind,
                reason: e.to_string(),
            })?;

        self.store
            .delete_binding(&binding.participant_id)
            .await
            .map_err(|e| ReleaseFailure {
                step: ReleaseStep::Delete,
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

#[async_trait]
impl Sweep for InactivityWatchdog {
    async fn sweep(&self) {
        match self.run_cycle(Utc::now()).await {
            Ok(report) if report.expired > 0 => info!(
                examined = report.examined,
                expired = report.expired,
                released = report.released().count(),
                "Sweep finished"
            ),
            Ok(_) => {}
            Err(e) => error!(error = %e, "Sweep failed"),
        }
    }
}
