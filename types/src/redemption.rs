//! Redemption records: the append-only audit trail of benefit use.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{BenefitId, BusinessId, MemberId, RedemptionId, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    /// Counts toward the duplicate window.
    Valid,
    /// Manually voided by an administrator; ignored by the duplicate check.
    Voided,
}

impl fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::Voided => f.write_str("voided"),
        }
    }
}

/// A persisted redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redemption {
    pub id: RedemptionId,
    pub member_id: MemberId,
    pub benefit_id: BenefitId,
    pub business_id: BusinessId,
    pub used_at: Timestamp,
    pub status: RedemptionStatus,
}

impl Redemption {
    /// Whether this record blocks a new redemption for the same
    /// member/business pair at `now`. Blocking ends once `window_secs`
    /// have fully elapsed since `used_at`.
    pub fn blocks(&self, window_secs: u64, now: Timestamp) -> bool {
        self.status == RedemptionStatus::Valid && !self.used_at.has_expired(window_secs, now)
    }
}

/// A redemption about to be inserted; the store assigns the id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRedemption {
    pub member_id: MemberId,
    pub benefit_id: BenefitId,
    pub business_id: BusinessId,
    pub used_at: Timestamp,
}

impl NewRedemption {
    /// Materialize the record with a store-assigned id and `valid` status.
    pub fn into_redemption(self, id: RedemptionId) -> Redemption {
        Redemption {
            id,
            member_id: self.member_id,
            benefit_id: self.benefit_id,
            business_id: self.business_id,
            used_at: self.used_at,
            status: RedemptionStatus::Valid,
        }
    }
}
