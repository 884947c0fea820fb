//! Membership storage trait.

use crate::StoreError;
use perkpass_types::{Member, MemberId};

/// Read access to member records owned by the identity/membership service.
pub trait MembershipStore: Send + Sync {
    /// Look up a member by id. `Ok(None)` when no such member exists.
    fn get_member(&self, id: &MemberId) -> Result<Option<Member>, StoreError>;
}
