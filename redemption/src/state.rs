//! Terminal state tracking.

use perkpass_types::{Benefit, Member, Redemption, Timestamp};
use serde::Serialize;

use crate::RejectReason;

/// A verified scan waiting for the operator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRedemption {
    pub member: Member,
    /// The benefit that will be redeemed on confirm.
    pub benefit: Benefit,
    /// Every benefit that was eligible at verification, by ascending id.
    pub eligible: Vec<Benefit>,
    pub verified_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelCause {
    /// The operator dismissed the confirmation.
    Operator,
    /// Nobody confirmed within the confirmation timeout.
    Timeout,
}

/// Where a terminal is in the redemption protocol.
///
/// `Decoding` through `CheckingDuplicate` and `Committing` are transient:
/// they are entered and left within one call. `Done`, `Rejected` and
/// `Cancelled` are terminal and accept a fresh submit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Decoding,
    Validating,
    Matching,
    CheckingDuplicate,
    AwaitingConfirmation(PendingRedemption),
    Committing,
    Done(Redemption),
    Rejected(RejectReason),
    Cancelled(CancelCause),
}

impl OrchestratorState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Decoding => "decoding",
            Self::Validating => "validating",
            Self::Matching => "matching",
            Self::CheckingDuplicate => "checking_duplicate",
            Self::AwaitingConfirmation(_) => "awaiting_confirmation",
            Self::Committing => "committing",
            Self::Done(_) => "done",
            Self::Rejected(_) => "rejected",
            Self::Cancelled(_) => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Rejected(_) | Self::Cancelled(_))
    }

    pub fn pending(&self) -> Option<&PendingRedemption> {
        match self {
            Self::AwaitingConfirmation(p) => Some(p),
            _ => None,
        }
    }
}
