//! Prometheus metrics for redemption activity.
//!
//! [`RedemptionMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! endpoint encodes into the Prometheus text exposition format. It is fed
//! from orchestrator events, both by the HTTP handlers (through
//! [`EventSink`]) and by the timeout sweeper.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

use perkpass_redemption::{CancelCause, CommitError, RedemptionEvent, RejectReason};
use perkpass_rpc::EventSink;

pub struct RedemptionMetrics {
    pub registry: Registry,

    /// Codes presented at any terminal.
    pub codes_submitted: IntCounter,
    /// Scans that passed verification and await confirmation.
    pub verifications_accepted: IntCounter,
    /// Rejections, labelled by reason.
    pub rejections: IntCounterVec,
    pub redemptions_committed: IntCounter,
    /// Confirms that lost the commit race to another terminal.
    pub commit_conflicts: IntCounter,
    pub confirmation_timeouts: IntCounter,
    pub operator_cancellations: IntCounter,

    /// Terminals currently awaiting confirmation.
    pub terminals_awaiting: IntGauge,
}

impl RedemptionMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let codes_submitted = register_int_counter_with_registry!(
            Opts::new("perkpass_codes_submitted_total", "Codes submitted to terminals"),
            registry
        )?;
        let verifications_accepted = register_int_counter_with_registry!(
            Opts::new(
                "perkpass_verifications_accepted_total",
                "Scans verified and awaiting confirmation"
            ),
            registry
        )?;
        let rejections = register_int_counter_vec_with_registry!(
            Opts::new("perkpass_rejections_total", "Rejected scans and confirms by reason"),
            &["reason"],
            registry
        )?;
        let redemptions_committed = register_int_counter_with_registry!(
            Opts::new("perkpass_redemptions_committed_total", "Redemptions recorded"),
            registry
        )?;
        let commit_conflicts = register_int_counter_with_registry!(
            Opts::new(
                "perkpass_commit_conflicts_total",
                "Confirms refused by the conditional insert"
            ),
            registry
        )?;
        let confirmation_timeouts = register_int_counter_with_registry!(
            Opts::new(
                "perkpass_confirmation_timeouts_total",
                "Pending confirmations cancelled by timeout"
            ),
            registry
        )?;
        let operator_cancellations = register_int_counter_with_registry!(
            Opts::new(
                "perkpass_operator_cancellations_total",
                "Pending confirmations cancelled by the operator"
            ),
            registry
        )?;
        let terminals_awaiting = register_int_gauge_with_registry!(
            Opts::new(
                "perkpass_terminals_awaiting_confirmation",
                "Terminals holding a verified scan"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            codes_submitted,
            verifications_accepted,
            rejections,
            redemptions_committed,
            commit_conflicts,
            confirmation_timeouts,
            operator_cancellations,
            terminals_awaiting,
        })
    }

    pub fn record(&self, events: &[RedemptionEvent]) {
        for event in events {
            match event {
                RedemptionEvent::Submitted => self.codes_submitted.inc(),
                RedemptionEvent::Verified { .. } => self.verifications_accepted.inc(),
                RedemptionEvent::Rejected { reason } => {
                    self.rejections.with_label_values(&[reason.label()]).inc();
                    if matches!(reason, RejectReason::Commit(CommitError::AlreadyRedeemed(_))) {
                        self.commit_conflicts.inc();
                    }
                }
                RedemptionEvent::Committed { .. } => self.redemptions_committed.inc(),
                RedemptionEvent::Cancelled { cause } => match cause {
                    CancelCause::Timeout => self.confirmation_timeouts.inc(),
                    CancelCause::Operator => self.operator_cancellations.inc(),
                },
            }
        }
    }
}

impl EventSink for RedemptionMetrics {
    fn record_events(&self, _terminal: &str, events: &[RedemptionEvent]) {
        self.record(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perkpass_codec::DecodeError;
    use std::time::Duration;

    #[test]
    fn events_feed_counters() {
        let metrics = RedemptionMetrics::new().unwrap();
        metrics.record(&[
            RedemptionEvent::Submitted,
            RedemptionEvent::Rejected {
                reason: RejectReason::Decode(DecodeError::NotBase64),
            },
            RedemptionEvent::Submitted,
            RedemptionEvent::Rejected {
                reason: RejectReason::Commit(CommitError::AlreadyRedeemed(Duration::from_secs(9))),
            },
            RedemptionEvent::Cancelled {
                cause: CancelCause::Timeout,
            },
        ]);

        assert_eq!(metrics.codes_submitted.get(), 2);
        assert_eq!(
            metrics.rejections.with_label_values(&["malformed_code"]).get(),
            1
        );
        assert_eq!(
            metrics.rejections.with_label_values(&["already_redeemed"]).get(),
            1
        );
        assert_eq!(metrics.commit_conflicts.get(), 1);
        assert_eq!(metrics.confirmation_timeouts.get(), 1);
        assert_eq!(metrics.operator_cancellations.get(), 0);
    }

    #[test]
    fn registry_exposes_every_family() {
        let metrics = RedemptionMetrics::new().unwrap();
        metrics.rejections.with_label_values(&["member_not_found"]).inc();
        let names: Vec<String> = metrics
            .registry
            .gather()
            .iter()
            .map(|f| f.get_name().to_string())
            .collect();
        assert!(names.contains(&"perkpass_codes_submitted_total".to_string()));
        assert!(names.contains(&"perkpass_rejections_total".to_string()));
        assert!(names.contains(&"perkpass_terminals_awaiting_confirmation".to_string()));
    }
}
