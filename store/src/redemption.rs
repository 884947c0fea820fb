//! Redemption storage trait.

use crate::StoreError;
use perkpass_types::{BusinessId, MemberId, NewRedemption, Redemption, RedemptionId, Timestamp};

/// Result of a conditional insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No conflicting redemption existed; the new record was written.
    Inserted(Redemption),
    /// A valid redemption for the same member/business pair already falls
    /// inside the window. Nothing was written; carries the blocking record.
    Conflict(Redemption),
}

/// Append-only redemption log.
///
/// Implementations MUST make [`insert_if_absent`](Self::insert_if_absent)
/// atomic: the conflict check and the write happen as one operation, so two
/// concurrent inserts for the same `(member, business)` pair inside the
/// window can never both succeed.
pub trait RedemptionStore: Send + Sync {
    /// Redemptions for `(member, business)` with `used_at >= since`,
    /// newest first. Includes voided records.
    fn find_recent(
        &self,
        member: &MemberId,
        business: &BusinessId,
        since: Timestamp,
    ) -> Result<Vec<Redemption>, StoreError>;

    /// Insert `redemption` unless a valid redemption for the same pair has
    /// `used_at` within `window_secs` before `redemption.used_at`.
    fn insert_if_absent(
        &self,
        redemption: NewRedemption,
        window_secs: u64,
    ) -> Result<InsertOutcome, StoreError>;

    /// All redemptions at a business with `used_at >= since`, newest first.
    fn list_redemptions_by_business(
        &self,
        business: &BusinessId,
        since: Timestamp,
    ) -> Result<Vec<Redemption>, StoreError>;

    /// A member's full redemption history, newest first.
    fn list_by_member(&self, member: &MemberId) -> Result<Vec<Redemption>, StoreError>;

    /// Mark a redemption voided (administrative correction). Voided records
    /// stay in the log but no longer count toward the duplicate window.
    fn void_redemption(&self, id: RedemptionId) -> Result<Redemption, StoreError>;
}
