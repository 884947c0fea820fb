//! Benefit selection for a business.
//!
//! The store may return inactive or out-of-window benefits; eligibility is
//! always decided here.

use std::sync::Arc;

use perkpass_store::BenefitStore;
use perkpass_types::{Benefit, BenefitId, BusinessId, Timestamp};

use crate::MatchError;

/// A sequence with at least one element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonEmpty<T>(Vec<T>);

impl<T> NonEmpty<T> {
    /// `None` when `items` is empty.
    pub fn from_vec(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    pub fn first(&self) -> &T {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }
}

#[derive(Clone)]
pub struct BenefitMatcher {
    benefits: Arc<dyn BenefitStore>,
}

impl BenefitMatcher {
    pub fn new(benefits: Arc<dyn BenefitStore>) -> Self {
        Self { benefits }
    }

    /// Benefits of `business` that are active and inside their validity
    /// window at `now`, sorted by ascending id.
    pub fn match_benefits(
        &self,
        business: &BusinessId,
        now: Timestamp,
    ) -> Result<NonEmpty<Benefit>, MatchError> {
        let listed = self
            .benefits
            .list_by_business(business)
            .map_err(|e| MatchError::Store(e.to_string()))?;
        let listed_count = listed.len();

        let mut eligible: Vec<Benefit> = listed
            .into_iter()
            .filter(|b| b.business_id == *business && b.is_eligible(now))
            .collect();
        eligible.sort_by_key(|b| b.id);

        tracing::debug!(
            business = %business,
            listed = listed_count,
            eligible = eligible.len(),
            "matched benefits"
        );
        NonEmpty::from_vec(eligible).ok_or(MatchError::NoEligibleBenefits(*business))
    }
}

/// Pick the benefit to redeem: the explicit `selection` if it is eligible,
/// otherwise the lowest id.
pub fn select_benefit(
    eligible: &NonEmpty<Benefit>,
    selection: Option<BenefitId>,
) -> Result<Benefit, MatchError> {
    match selection {
        None => Ok(eligible.first().clone()),
        Some(id) => eligible
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(MatchError::BenefitNotEligible(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perkpass_nullables::NullStore;

    fn benefit(id: u64, business: BusinessId) -> Benefit {
        Benefit {
            id: BenefitId::new(id),
            business_id: business,
            description: format!("benefit {id}"),
            discount_percent: 15,
            usage_limit: 1,
            valid_from: None,
            valid_to: None,
            active: true,
        }
    }

    fn matcher_with(benefits: Vec<Benefit>) -> BenefitMatcher {
        let store = NullStore::new();
        for b in benefits {
            store.put_benefit(b);
        }
        BenefitMatcher::new(Arc::new(store))
    }

    #[test]
    fn filters_window_and_active_and_sorts() {
        let biz = BusinessId::random();
        let mut expired = benefit(1, biz);
        expired.valid_to = Some(Timestamp::new(99));
        let mut future = benefit(2, biz);
        future.valid_from = Some(Timestamp::new(101));
        let mut inactive = benefit(3, biz);
        inactive.active = false;
        let mut edge = benefit(9, biz);
        edge.valid_from = Some(Timestamp::new(100));
        edge.valid_to = Some(Timestamp::new(100));
        let open = benefit(5, biz);

        let matcher = matcher_with(vec![edge, expired, future, inactive, open]);
        let ids: Vec<u64> = matcher
            .match_benefits(&biz, Timestamp::new(100))
            .unwrap()
            .iter()
            .map(|b| b.id.get())
            .collect();
        assert_eq!(ids, vec![5, 9]);
    }

    #[test]
    fn empty_business_has_no_eligible_benefits() {
        let biz = BusinessId::random();
        let matcher = matcher_with(vec![benefit(1, BusinessId::random())]);
        assert_eq!(
            matcher.match_benefits(&biz, Timestamp::new(0)),
            Err(MatchError::NoEligibleBenefits(biz))
        );
    }

    #[test]
    fn selection_defaults_to_lowest_id() {
        let biz = BusinessId::random();
        let eligible = NonEmpty::from_vec(vec![benefit(4, biz), benefit(7, biz)]).unwrap();
        assert_eq!(select_benefit(&eligible, None).unwrap().id, BenefitId::new(4));
        assert_eq!(
            select_benefit(&eligible, Some(BenefitId::new(7))).unwrap().id,
            BenefitId::new(7)
        );
        assert_eq!(
            select_benefit(&eligible, Some(BenefitId::new(8))),
            Err(MatchError::BenefitNotEligible(BenefitId::new(8)))
        );
    }

    #[test]
    fn non_empty_rejects_empty_vec() {
        assert!(NonEmpty::<u8>::from_vec(Vec::new()).is_none());
    }
}
