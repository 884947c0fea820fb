//! Typed identifiers.
//!
//! Members and businesses are keyed by the identity store's UUID primary key.
//! Benefits and redemptions use store-assigned sequence numbers, which gives
//! benefits a stable ordering for deterministic selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::TypesError;

/// Length of a hyphenated UUID (`8-4-4-4-12`).
pub const HYPHENATED_UUID_LEN: usize = 36;

/// Parse only the canonical hyphenated UUID form.
///
/// `Uuid::parse_str` also accepts the simple, braced and URN forms; the
/// identity store never emits those, so they are refused here.
fn parse_hyphenated(raw: &str) -> Option<Uuid> {
    if raw.len() != HYPHENATED_UUID_LEN {
        return None;
    }
    Uuid::parse_str(raw).ok()
}

/// Identity-store primary key of a member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(Uuid);

impl MemberId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// First eight characters, for log lines and operator messages.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl FromStr for MemberId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hyphenated(s)
            .map(Self)
            .ok_or_else(|| TypesError::InvalidMemberId(s.to_string()))
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Identity-store primary key of a business.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusinessId(Uuid);

impl BusinessId {
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl FromStr for BusinessId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hyphenated(s)
            .map(Self)
            .ok_or_else(|| TypesError::InvalidBusinessId(s.to_string()))
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub const fn get(&self) -> u64 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>()
                    .map(Self)
                    .map_err(|_| TypesError::InvalidNumericId(s.to_string()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Store-assigned id of a benefit. Lower ids were created earlier.
    BenefitId
);

numeric_id!(
    /// Store-assigned id of a redemption record.
    RedemptionId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_id_requires_hyphenated_form() {
        let id = "4f9d2c1e-8b7a-4e6f-9a3b-1c2d3e4f5a6b";
        let parsed: MemberId = id.parse().expect("hyphenated uuid");
        assert_eq!(parsed.to_string(), id);
        assert_eq!(parsed.short(), "4f9d2c1e");

        let simple = "4f9d2c1e8b7a4e6f9a3b1c2d3e4f5a6b";
        assert_eq!(
            simple.parse::<MemberId>(),
            Err(TypesError::InvalidMemberId(simple.to_string()))
        );
        assert!("4f9d2c1e".parse::<MemberId>().is_err());
        assert!("zzzzzzzz-8b7a-4e6f-9a3b-1c2d3e4f5a6b".parse::<MemberId>().is_err());
    }

    #[test]
    fn benefit_ids_order_numerically() {
        let mut ids = vec![BenefitId::new(10), BenefitId::new(2), BenefitId::new(7)];
        ids.sort();
        assert_eq!(ids, vec![BenefitId::new(2), BenefitId::new(7), BenefitId::new(10)]);
        assert_eq!("42".parse::<BenefitId>(), Ok(BenefitId::new(42)));
        assert!("-1".parse::<BenefitId>().is_err());
    }
}
