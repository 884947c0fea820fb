//! Benefits offered by businesses.

use serde::{Deserialize, Serialize};

use crate::{BenefitId, BusinessId, Timestamp};

/// A discount or perk offered by a business, bounded by a validity window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benefit {
    pub id: BenefitId,
    pub business_id: BusinessId,
    pub description: String,
    /// Percentage off, 0–100.
    pub discount_percent: u8,
    /// Uses granted per redemption window. Informational to the core.
    pub usage_limit: u32,
    /// Start of validity; `None` means open-ended.
    #[serde(default)]
    pub valid_from: Option<Timestamp>,
    /// End of validity (inclusive); `None` means open-ended.
    #[serde(default)]
    pub valid_to: Option<Timestamp>,
    pub active: bool,
}

impl Benefit {
    /// Whether `now` falls inside `[valid_from, valid_to]`.
    pub fn in_window(&self, now: Timestamp) -> bool {
        self.valid_from.map_or(true, |from| from <= now)
            && self.valid_to.map_or(true, |to| now <= to)
    }

    /// Active and currently within its validity window.
    pub fn is_eligible(&self, now: Timestamp) -> bool {
        self.active && self.in_window(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn benefit(from: Option<u64>, to: Option<u64>, active: bool) -> Benefit {
        Benefit {
            id: BenefitId::new(1),
            business_id: BusinessId::random(),
            description: "2x1 coffee".into(),
            discount_percent: 50,
            usage_limit: 1,
            valid_from: from.map(Timestamp::new),
            valid_to: to.map(Timestamp::new),
            active,
        }
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let b = benefit(Some(100), Some(200), true);
        assert!(!b.is_eligible(Timestamp::new(99)));
        assert!(b.is_eligible(Timestamp::new(100)));
        assert!(b.is_eligible(Timestamp::new(200)));
        assert!(!b.is_eligible(Timestamp::new(201)));
    }

    #[test]
    fn unpopulated_bounds_are_open() {
        assert!(benefit(None, None, true).is_eligible(Timestamp::new(u64::MAX)));
        assert!(benefit(None, Some(10), true).is_eligible(Timestamp::EPOCH));
    }

    #[test]
    fn inactive_is_never_eligible() {
        assert!(!benefit(None, None, false).is_eligible(Timestamp::new(5)));
    }
}
