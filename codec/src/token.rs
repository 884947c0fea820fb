//! The decoded content of a membership code.

use perkpass_types::{MemberId, Timestamp};
use serde::{Deserialize, Serialize};

/// Identity presented by a scanned membership code. Transient: consumed by
/// one redemption attempt and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
    pub member_id: MemberId,
    /// Unix milliseconds at issuance, as written by the issuing side.
    pub issued_at_millis: u64,
    pub nonce: String,
}

impl BearerToken {
    pub fn new(member_id: MemberId, issued_at_millis: u64, nonce: impl Into<String>) -> Self {
        Self {
            member_id,
            issued_at_millis,
            nonce: nonce.into(),
        }
    }

    /// Issuance time at second granularity.
    pub fn issued_at(&self) -> Timestamp {
        Timestamp::from_millis(self.issued_at_millis)
    }
}
