//! LMDB implementation of BenefitStore.
//!
//! Benefits are keyed by `(business, benefit_id)` so listing one business is
//! a prefix range-scan that already comes back in id order.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use perkpass_store::{BenefitStore, StoreError};
use perkpass_types::{Benefit, BusinessId};

use crate::keys::{benefit_key, increment_prefix};
use crate::LmdbError;

pub struct LmdbBenefitStore {
    pub(crate) env: Arc<Env>,
    pub(crate) benefits_db: Database<Bytes, Bytes>,
}

impl LmdbBenefitStore {
    /// Insert or replace a benefit.
    pub fn put_benefit(&self, benefit: &Benefit) -> Result<(), StoreError> {
        let key = benefit_key(&benefit.business_id, benefit.id);
        let bytes = bincode::serialize(benefit).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.benefits_db
            .put(&mut wtxn, &key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn scan_business(&self, business: &BusinessId) -> Result<Vec<Benefit>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let prefix = business.as_bytes().as_slice();
        let mut upper = prefix.to_vec();
        let upper_bound = if increment_prefix(&mut upper) {
            Bound::Excluded(upper.as_slice())
        } else {
            Bound::Unbounded
        };
        let bounds = (Bound::Included(prefix), upper_bound);
        let mut benefits = Vec::new();
        for result in self.benefits_db.range(&rtxn, &bounds)? {
            let (_key, val) = result?;
            benefits.push(bincode::deserialize(val)?);
        }
        Ok(benefits)
    }
}

impl BenefitStore for LmdbBenefitStore {
    fn list_by_business(&self, business: &BusinessId) -> Result<Vec<Benefit>, StoreError> {
        Ok(self.scan_business(business)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use perkpass_types::BenefitId;

    fn benefit(id: u64, business: BusinessId) -> Benefit {
        Benefit {
            id: BenefitId::new(id),
            business_id: business,
            description: format!("benefit {id}"),
            discount_percent: 10,
            usage_limit: 1,
            valid_from: None,
            valid_to: None,
            active: true,
        }
    }

    #[test]
    fn lists_only_the_business_in_id_order() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 10 << 20).unwrap();
        let store = env.benefit_store();
        let (cafe, bar) = (BusinessId::random(), BusinessId::random());

        for id in [300u64, 2, 70] {
            store.put_benefit(&benefit(id, cafe)).unwrap();
        }
        store.put_benefit(&benefit(5, bar)).unwrap();

        let ids: Vec<u64> = store
            .list_by_business(&cafe)
            .unwrap()
            .iter()
            .map(|b| b.id.get())
            .collect();
        assert_eq!(ids, vec![2, 70, 300]);
        assert!(store.list_by_business(&BusinessId::random()).unwrap().is_empty());
    }

    #[test]
    fn inactive_benefits_are_still_listed() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 10 << 20).unwrap();
        let store = env.benefit_store();
        let business = BusinessId::random();
        let mut inactive = benefit(1, business);
        inactive.active = false;
        store.put_benefit(&inactive).unwrap();
        assert_eq!(store.list_by_business(&business).unwrap(), vec![inactive]);
    }
}
