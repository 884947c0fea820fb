//! Redemption orchestrator: drives one terminal through verify, confirm and
//! commit as an explicit state machine.
//!
//! Every protocol failure is captured in the returned [`VerificationResult`]
//! or [`RedemptionResult`]; only caller misuse surfaces as
//! [`OrchestratorError`].

use std::sync::Arc;

use perkpass_store::{BenefitStore, MembershipStore, RedemptionStore};
use perkpass_types::{
    Benefit, BenefitId, BusinessId, Clock, Member, MemberId, Redemption, RedemptionParams,
    Timestamp,
};
use serde::Serialize;

use crate::guard::RedemptionGuard;
use crate::matcher::{select_benefit, BenefitMatcher};
use crate::state::{CancelCause, OrchestratorState, PendingRedemption};
use crate::validator::MembershipValidator;
use crate::{OrchestratorError, RejectReason};

/// Events emitted by the orchestrator for the node to process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedemptionEvent {
    /// A code was accepted for processing.
    Submitted,
    /// Verification passed; the terminal is awaiting confirmation.
    Verified { member: MemberId, benefit: BenefitId },
    /// A submit or confirm ended in `Rejected`.
    Rejected { reason: RejectReason },
    /// A redemption was recorded.
    Committed { redemption: Redemption },
    /// A pending confirmation was dropped.
    Cancelled { cause: CancelCause },
}

/// Outcome of [`RedemptionOrchestrator::submit`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefit: Option<Benefit>,
}

impl VerificationResult {
    fn accepted(pending: &PendingRedemption) -> Self {
        Self {
            valid: true,
            message: format!(
                "Valid {} membership for {}: {} ({}% off)",
                pending.member.membership_type,
                pending.member.name,
                pending.benefit.description,
                pending.benefit.discount_percent
            ),
            member: Some(pending.member.clone()),
            benefit: Some(pending.benefit.clone()),
        }
    }

    fn rejected(reason: &RejectReason) -> Self {
        Self {
            valid: false,
            message: reason.to_string(),
            member: None,
            benefit: None,
        }
    }
}

/// Outcome of [`RedemptionOrchestrator::confirm`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RedemptionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redemption: Option<Redemption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The stores an orchestrator reads and writes.
#[derive(Clone)]
pub struct Stores {
    pub members: Arc<dyn MembershipStore>,
    pub benefits: Arc<dyn BenefitStore>,
    pub redemptions: Arc<dyn RedemptionStore>,
}

impl Stores {
    /// Use one backend for all three roles.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: MembershipStore + BenefitStore + RedemptionStore + 'static,
    {
        Self {
            members: Arc::clone(&store) as Arc<dyn MembershipStore>,
            benefits: Arc::clone(&store) as Arc<dyn BenefitStore>,
            redemptions: store,
        }
    }
}

/// One terminal's redemption flow. A terminal is bound to one business.
pub struct RedemptionOrchestrator {
    terminal_id: String,
    business_id: BusinessId,
    validator: MembershipValidator,
    matcher: BenefitMatcher,
    guard: RedemptionGuard,
    clock: Arc<dyn Clock>,
    confirmation_timeout_secs: u64,
    state: OrchestratorState,
    /// Pending events for the node to process.
    pending_events: Vec<RedemptionEvent>,
}

impl RedemptionOrchestrator {
    pub fn new(
        terminal_id: impl Into<String>,
        business_id: BusinessId,
        stores: &Stores,
        clock: Arc<dyn Clock>,
        params: &RedemptionParams,
    ) -> Self {
        Self {
            terminal_id: terminal_id.into(),
            business_id,
            validator: MembershipValidator::new(Arc::clone(&stores.members)),
            matcher: BenefitMatcher::new(Arc::clone(&stores.benefits)),
            guard: RedemptionGuard::new(
                Arc::clone(&stores.redemptions),
                params.duplicate_window_secs,
            ),
            clock,
            confirmation_timeout_secs: params.confirmation_timeout_secs,
            state: OrchestratorState::Idle,
            pending_events: Vec::new(),
        }
    }

    pub fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    pub fn business_id(&self) -> BusinessId {
        self.business_id
    }

    /// Current state, after applying the confirmation timeout.
    pub fn state(&mut self) -> &OrchestratorState {
        let now = self.clock.now();
        self.expire_pending(now);
        &self.state
    }

    /// Current state as last stored, without consulting the clock.
    pub fn peek_state(&self) -> &OrchestratorState {
        &self.state
    }

    /// When the pending confirmation will be auto-cancelled.
    pub fn confirmation_deadline(&self) -> Option<Timestamp> {
        self.state
            .pending()
            .map(|p| p.verified_at.plus_secs(self.confirmation_timeout_secs))
    }

    /// Verify a scanned code, redeeming the lowest-id eligible benefit.
    pub fn submit(&mut self, raw_code: &str) -> Result<VerificationResult, OrchestratorError> {
        self.submit_inner(raw_code, None)
    }

    /// Verify a scanned code for an explicitly selected benefit.
    pub fn submit_with_benefit(
        &mut self,
        raw_code: &str,
        benefit: BenefitId,
    ) -> Result<VerificationResult, OrchestratorError> {
        self.submit_inner(raw_code, Some(benefit))
    }

    fn submit_inner(
        &mut self,
        raw_code: &str,
        selection: Option<BenefitId>,
    ) -> Result<VerificationResult, OrchestratorError> {
        let now = self.clock.now();
        self.expire_pending(now);
        if self.state.pending().is_some() {
            return Err(OrchestratorError::OperationInProgress);
        }

        self.pending_events.push(RedemptionEvent::Submitted);
        self.transition(OrchestratorState::Decoding);

        match self.verify(raw_code, selection, now) {
            Ok(pending) => {
                tracing::info!(
                    terminal = %self.terminal_id,
                    member = %pending.member.id.short(),
                    benefit = %pending.benefit.id,
                    "scan verified, awaiting confirmation"
                );
                let result = VerificationResult::accepted(&pending);
                self.pending_events.push(RedemptionEvent::Verified {
                    member: pending.member.id,
                    benefit: pending.benefit.id,
                });
                self.transition(OrchestratorState::AwaitingConfirmation(pending));
                Ok(result)
            }
            Err(reason) => Ok(VerificationResult::rejected(&self.reject(reason))),
        }
    }

    /// Decoding through CheckingDuplicate. Nothing is written.
    fn verify(
        &mut self,
        raw_code: &str,
        selection: Option<BenefitId>,
        now: Timestamp,
    ) -> Result<PendingRedemption, RejectReason> {
        let token = perkpass_codec::decode(raw_code)?;

        self.transition(OrchestratorState::Validating);
        let member = self.validator.validate(&token.member_id, now)?;

        self.transition(OrchestratorState::Matching);
        let eligible = self.matcher.match_benefits(&self.business_id, now)?;
        let benefit = select_benefit(&eligible, selection)?;

        self.transition(OrchestratorState::CheckingDuplicate);
        self.guard
            .check_duplicate(&member.id, &self.business_id, now)?;

        Ok(PendingRedemption {
            member,
            benefit,
            eligible: eligible.into_vec(),
            verified_at: now,
        })
    }

    /// Commit the pending redemption.
    pub fn confirm(&mut self) -> Result<RedemptionResult, OrchestratorError> {
        let now = self.clock.now();
        self.expire_pending(now);
        let pending = self.take_pending(OrchestratorState::Committing)?;

        match self
            .guard
            .commit(&pending.member.id, pending.benefit.id, &self.business_id, now)
        {
            Ok(redemption) => {
                tracing::info!(
                    terminal = %self.terminal_id,
                    redemption = %redemption.id,
                    member = %redemption.member_id.short(),
                    benefit = %redemption.benefit_id,
                    "redemption committed"
                );
                self.pending_events.push(RedemptionEvent::Committed {
                    redemption: redemption.clone(),
                });
                self.transition(OrchestratorState::Done(redemption.clone()));
                Ok(RedemptionResult {
                    success: true,
                    redemption: Some(redemption),
                    error: None,
                })
            }
            Err(e) => {
                let reason = self.reject(e.into());
                Ok(RedemptionResult {
                    success: false,
                    redemption: None,
                    error: Some(reason.to_string()),
                })
            }
        }
    }

    /// Drop the pending redemption. Nothing was persisted, so nothing is undone.
    pub fn cancel(&mut self) -> Result<(), OrchestratorError> {
        let now = self.clock.now();
        self.expire_pending(now);
        self.take_pending(OrchestratorState::Cancelled(CancelCause::Operator))?;
        tracing::info!(terminal = %self.terminal_id, "pending redemption cancelled by operator");
        self.pending_events.push(RedemptionEvent::Cancelled {
            cause: CancelCause::Operator,
        });
        Ok(())
    }

    /// Return a finished terminal to `Idle`.
    pub fn dismiss(&mut self) -> Result<(), OrchestratorError> {
        let now = self.clock.now();
        self.expire_pending(now);
        if self.state.pending().is_some() {
            return Err(OrchestratorError::OperationInProgress);
        }
        if self.state.is_terminal() {
            self.transition(OrchestratorState::Idle);
        }
        Ok(())
    }

    /// Cancel the pending confirmation if it has waited past the timeout.
    /// Returns whether it did.
    pub fn expire_pending(&mut self, now: Timestamp) -> bool {
        let due = self
            .state
            .pending()
            .is_some_and(|p| p.verified_at.has_expired(self.confirmation_timeout_secs, now));
        if !due {
            return false;
        }
        tracing::warn!(
            terminal = %self.terminal_id,
            timeout_secs = self.confirmation_timeout_secs,
            "confirmation timed out, releasing terminal"
        );
        self.transition(OrchestratorState::Cancelled(CancelCause::Timeout));
        self.pending_events.push(RedemptionEvent::Cancelled {
            cause: CancelCause::Timeout,
        });
        true
    }

    /// Drain pending events for the node to process.
    pub fn drain_events(&mut self) -> Vec<RedemptionEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Move out of `AwaitingConfirmation` into `next`, returning the pending
    /// redemption. Leaves the state untouched otherwise.
    fn take_pending(
        &mut self,
        next: OrchestratorState,
    ) -> Result<PendingRedemption, OrchestratorError> {
        if self.state.pending().is_none() {
            return Err(OrchestratorError::NothingPending);
        }
        self.log_transition(&next);
        match std::mem::replace(&mut self.state, next) {
            OrchestratorState::AwaitingConfirmation(pending) => Ok(pending),
            _ => Err(OrchestratorError::NothingPending),
        }
    }

    fn reject(&mut self, reason: RejectReason) -> RejectReason {
        tracing::warn!(
            terminal = %self.terminal_id,
            reason = reason.label(),
            detail = %reason,
            "redemption rejected"
        );
        self.pending_events.push(RedemptionEvent::Rejected {
            reason: reason.clone(),
        });
        self.transition(OrchestratorState::Rejected(reason.clone()));
        reason
    }

    fn transition(&mut self, next: OrchestratorState) {
        self.log_transition(&next);
        self.state = next;
    }

    fn log_transition(&self, next: &OrchestratorState) {
        tracing::debug!(
            terminal = %self.terminal_id,
            from = self.state.label(),
            to = next.label(),
            "state transition"
        );
    }
}
