//! Failure taxonomy of the redemption protocol.
//!
//! Every message starts with the variant name so operators and logs can
//! match on it (`AlreadyRedeemed: ...`).

use std::time::Duration;

use perkpass_types::{BenefitId, BusinessId, MemberId, Timestamp};
use perkpass_utils::format_duration;
use thiserror::Error;

pub use perkpass_codec::DecodeError;

fn retry_in(d: &Duration) -> String {
    format_duration(*d)
}

/// Member absent or expired. User-facing, not retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("NotFound: no membership exists for member {0}")]
    NotFound(MemberId),

    #[error("Expired: membership expired at {} (unix seconds)", .0.as_secs())]
    Expired(Timestamp),

    #[error("Store: membership lookup failed: {0}")]
    Store(String),
}

/// Business misconfigured or selection invalid. Operator/admin-facing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("NoEligibleBenefits: business {0} has no active benefit valid right now")]
    NoEligibleBenefits(BusinessId),

    #[error("BenefitNotEligible: benefit {0} is not currently eligible at this business")]
    BenefitNotEligible(BenefitId),

    #[error("Store: benefit lookup failed: {0}")]
    Store(String),
}

/// The member already redeemed at this business inside the window.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DuplicateError {
    #[error("AlreadyRedeemed: benefit already used at this business, retry in {}", retry_in(.0))]
    AlreadyRedeemed(Duration),

    #[error("StoreUnavailable: redemption history lookup failed: {0}")]
    StoreUnavailable(String),
}

impl DuplicateError {
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::AlreadyRedeemed(d) => Some(*d),
            Self::StoreUnavailable(_) => None,
        }
    }
}

/// Failure of the conditional insert.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    /// Another terminal committed for the same pair first.
    #[error("AlreadyRedeemed: benefit already used at this business, retry in {}", retry_in(.0))]
    AlreadyRedeemed(Duration),

    /// Transient persistence failure; the whole submit may be retried.
    #[error("StoreUnavailable: could not record redemption: {0}")]
    StoreUnavailable(String),
}

/// Caller protocol misuse. The only errors that escape the orchestrator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("OperationInProgress: a verified scan is awaiting confirmation or cancellation")]
    OperationInProgress,

    #[error("NothingPending: no verified scan is awaiting confirmation")]
    NothingPending,
}

/// Terminal registration failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("InvalidTerminalId: terminal id must not be blank")]
    InvalidTerminalId,

    #[error("BoundToOtherBusiness: terminal {terminal} already serves business {business}")]
    BoundToOtherBusiness {
        terminal: String,
        business: BusinessId,
    },
}

/// Why a redemption attempt ended in `Rejected`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Duplicate(#[from] DuplicateError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl RejectReason {
    /// Stable low-cardinality label, used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Decode(_) => "malformed_code",
            Self::Validation(ValidationError::NotFound(_)) => "member_not_found",
            Self::Validation(ValidationError::Expired(_)) => "membership_expired",
            Self::Match(MatchError::NoEligibleBenefits(_)) => "no_eligible_benefits",
            Self::Match(MatchError::BenefitNotEligible(_)) => "benefit_not_eligible",
            Self::Duplicate(DuplicateError::AlreadyRedeemed(_))
            | Self::Commit(CommitError::AlreadyRedeemed(_)) => "already_redeemed",
            Self::Validation(ValidationError::Store(_))
            | Self::Match(MatchError::Store(_))
            | Self::Duplicate(DuplicateError::StoreUnavailable(_))
            | Self::Commit(CommitError::StoreUnavailable(_)) => "store_unavailable",
        }
    }

    /// Whether repeating the same submit may succeed without any change.
    pub fn is_transient(&self) -> bool {
        self.label() == "store_unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_lead_with_variant_name() {
        let dup = DuplicateError::AlreadyRedeemed(Duration::from_secs(3_600 + 120));
        assert_eq!(
            dup.to_string(),
            "AlreadyRedeemed: benefit already used at this business, retry in 1h 2m"
        );
        let reason = RejectReason::from(DecodeError::NotBase64);
        assert!(reason.to_string().starts_with("NotBase64"));
        assert_eq!(reason.label(), "malformed_code");
    }

    #[test]
    fn only_store_failures_are_transient() {
        assert!(RejectReason::from(CommitError::StoreUnavailable("down".into())).is_transient());
        assert!(!RejectReason::from(CommitError::AlreadyRedeemed(Duration::ZERO)).is_transient());
        assert!(!RejectReason::from(ValidationError::Expired(Timestamp::new(1))).is_transient());
    }
}
