//! Membership validation: existence and expiry.

use std::sync::Arc;

use perkpass_store::MembershipStore;
use perkpass_types::{Member, MemberId, Timestamp};

use crate::ValidationError;

/// Checks a decoded identity against the membership store. Read-only.
#[derive(Clone)]
pub struct MembershipValidator {
    members: Arc<dyn MembershipStore>,
}

impl MembershipValidator {
    pub fn new(members: Arc<dyn MembershipStore>) -> Self {
        Self { members }
    }

    /// Return the member if it exists and `now` is not past its expiry.
    pub fn validate(&self, id: &MemberId, now: Timestamp) -> Result<Member, ValidationError> {
        let member = self
            .members
            .get_member(id)
            .map_err(|e| ValidationError::Store(e.to_string()))?
            .ok_or(ValidationError::NotFound(*id))?;

        if member.is_expired(now) {
            return Err(ValidationError::Expired(member.expires_at));
        }
        Ok(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perkpass_nullables::NullStore;
    use perkpass_types::MembershipType;

    fn setup(expires_at: u64) -> (Arc<NullStore>, MembershipValidator, Member) {
        let store = Arc::new(NullStore::new());
        let mut member = Member::provision(
            MemberId::random(),
            "m@example.com",
            "Mara",
            MembershipType::Resident,
            Timestamp::new(0),
        );
        member.expires_at = Timestamp::new(expires_at);
        store.put_member(member.clone());
        (Arc::clone(&store), MembershipValidator::new(store), member)
    }

    #[test]
    fn accepts_member_up_to_expiry_instant() {
        let (_store, validator, member) = setup(1_000);
        assert_eq!(validator.validate(&member.id, Timestamp::new(1_000)), Ok(member));
    }

    #[test]
    fn rejects_after_expiry() {
        let (_store, validator, member) = setup(1_000);
        assert_eq!(
            validator.validate(&member.id, Timestamp::new(1_001)),
            Err(ValidationError::Expired(Timestamp::new(1_000)))
        );
    }

    #[test]
    fn unknown_member_is_not_found() {
        let (_store, validator, _) = setup(1_000);
        let stranger = MemberId::random();
        assert_eq!(
            validator.validate(&stranger, Timestamp::new(0)),
            Err(ValidationError::NotFound(stranger))
        );
    }

    #[test]
    fn store_failure_is_reported() {
        let (store, validator, member) = setup(1_000);
        store.set_unavailable(true);
        assert!(matches!(
            validator.validate(&member.id, Timestamp::new(0)),
            Err(ValidationError::Store(_))
        ));
    }
}
