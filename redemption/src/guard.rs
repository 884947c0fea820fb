//! Duplicate-window enforcement and the redemption write.

use std::sync::Arc;

use perkpass_store::{InsertOutcome, RedemptionStore};
use perkpass_types::{BenefitId, BusinessId, MemberId, NewRedemption, Redemption, Timestamp};

use crate::{CommitError, DuplicateError};

#[derive(Clone)]
pub struct RedemptionGuard {
    redemptions: Arc<dyn RedemptionStore>,
    window_secs: u64,
}

impl RedemptionGuard {
    pub fn new(redemptions: Arc<dyn RedemptionStore>, window_secs: u64) -> Self {
        Self {
            redemptions,
            window_secs,
        }
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Fail if a valid redemption for the pair still blocks at `now`.
    ///
    /// Advisory only: it lets the terminal reject early, but the invariant is
    /// enforced by [`commit`](Self::commit).
    ///
    /// The window is half-open: a record used exactly `window_secs` ago is
    /// returned by the store scan but no longer blocks, matching the
    /// conditional insert.
    pub fn check_duplicate(
        &self,
        member: &MemberId,
        business: &BusinessId,
        now: Timestamp,
    ) -> Result<(), DuplicateError> {
        let since = now.minus_secs(self.window_secs);
        let recent = self
            .redemptions
            .find_recent(member, business, since)
            .map_err(|e| DuplicateError::StoreUnavailable(e.to_string()))?;

        match recent
            .iter()
            .filter(|r| r.blocks(self.window_secs, now))
            .max_by_key(|r| r.used_at)
        {
            Some(last) => Err(DuplicateError::AlreadyRedeemed(
                last.used_at.remaining(self.window_secs, now),
            )),
            None => Ok(()),
        }
    }

    /// Record a redemption at `now` with one conditional insert.
    pub fn commit(
        &self,
        member: &MemberId,
        benefit: BenefitId,
        business: &BusinessId,
        now: Timestamp,
    ) -> Result<Redemption, CommitError> {
        let new = NewRedemption {
            member_id: *member,
            benefit_id: benefit,
            business_id: *business,
            used_at: now,
        };
        match self.redemptions.insert_if_absent(new, self.window_secs) {
            Ok(InsertOutcome::Inserted(redemption)) => Ok(redemption),
            Ok(InsertOutcome::Conflict(existing)) => {
                tracing::warn!(
                    member = %member,
                    business = %business,
                    existing = %existing.id,
                    "conditional insert lost to a concurrent redemption"
                );
                Err(CommitError::AlreadyRedeemed(
                    existing.used_at.remaining(self.window_secs, now),
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "redemption store unavailable at commit");
                Err(CommitError::StoreUnavailable(e.to_string()))
            }
        }
    }
}
