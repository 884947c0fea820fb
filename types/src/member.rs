//! Member records and membership terms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{MemberId, Timestamp, TypesError};

const DAY_SECS: u64 = 24 * 3600;

/// The kind of membership a member holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipType {
    /// Short-stay visitor pass.
    Tourist,
    /// Local resident membership.
    Resident,
}

impl MembershipType {
    /// Length of a membership term from the moment it is provisioned.
    pub fn term_secs(&self) -> u64 {
        match self {
            Self::Tourist => 7 * DAY_SECS,
            Self::Resident => 90 * DAY_SECS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tourist => "tourist",
            Self::Resident => "resident",
        }
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipType {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tourist" => Ok(Self::Tourist),
            "resident" => Ok(Self::Resident),
            other => Err(TypesError::UnknownMembershipType(other.to_string())),
        }
    }
}

/// A member as seen by the redemption core (read-only).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub email: String,
    pub name: String,
    pub membership_type: MembershipType,
    /// Materialized by provisioning; the core never computes it lazily.
    pub expires_at: Timestamp,
    /// Reference to the member's profile picture in object storage.
    #[serde(default)]
    pub profile_image_ref: Option<String>,
}

impl Member {
    /// Build a member whose expiry is `created_at` plus the default term of
    /// its membership type.
    pub fn provision(
        id: MemberId,
        email: impl Into<String>,
        name: impl Into<String>,
        membership_type: MembershipType,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            email: email.into(),
            name: name.into(),
            membership_type,
            expires_at: created_at.plus_secs(membership_type.term_secs()),
            profile_image_ref: None,
        }
    }

    /// A membership is expired strictly after its expiry instant.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provision_applies_term_by_type() {
        let created = Timestamp::new(1_000_000);
        let tourist = Member::provision(
            MemberId::random(),
            "t@example.com",
            "Tess",
            MembershipType::Tourist,
            created,
        );
        let resident = Member::provision(
            MemberId::random(),
            "r@example.com",
            "Ravi",
            MembershipType::Resident,
            created,
        );
        assert_eq!(tourist.expires_at, created.plus_secs(7 * DAY_SECS));
        assert_eq!(resident.expires_at, created.plus_secs(90 * DAY_SECS));
    }

    #[test]
    fn expiry_is_strictly_after_expires_at() {
        let member = Member::provision(
            MemberId::random(),
            "a@example.com",
            "Ana",
            MembershipType::Tourist,
            Timestamp::new(0),
        );
        assert!(!member.is_expired(member.expires_at));
        assert!(member.is_expired(member.expires_at.plus_secs(1)));
    }

    #[test]
    fn membership_type_parses_case_insensitively() {
        assert_eq!("Tourist".parse(), Ok(MembershipType::Tourist));
        assert_eq!("RESIDENT".parse(), Ok(MembershipType::Resident));
        assert!("vip".parse::<MembershipType>().is_err());
    }
}
