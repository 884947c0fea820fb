//! Nullable store: thread-safe in-memory storage for testing.

use perkpass_store::{BenefitStore, InsertOutcome, MembershipStore, RedemptionStore, StoreError};
use perkpass_types::{
    Benefit, BusinessId, Member, MemberId, NewRedemption, Redemption, RedemptionId,
    RedemptionStatus, Timestamp,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
struct RedemptionLog {
    records: Vec<Redemption>,
    next_id: u64,
}

/// An in-memory membership + benefit + redemption store for testing.
/// Thread-safe for use from several terminals at once.
///
/// The conditional insert holds the log mutex across the conflict check
/// and the append, mirroring the single write transaction of a real backend.
pub struct NullStore {
    members: Mutex<HashMap<MemberId, Member>>,
    benefits: Mutex<Vec<Benefit>>,
    redemptions: Mutex<RedemptionLog>,
    calls: AtomicUsize,
    unavailable: AtomicBool,
    inserts_unavailable: AtomicBool,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(HashMap::new()),
            benefits: Mutex::new(Vec::new()),
            redemptions: Mutex::new(RedemptionLog::default()),
            calls: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            inserts_unavailable: AtomicBool::new(false),
        }
    }

    /// Seed a member. Not counted as a store call.
    pub fn put_member(&self, member: Member) {
        self.members.lock().unwrap().insert(member.id, member);
    }

    /// Seed a benefit. Not counted as a store call.
    pub fn put_benefit(&self, benefit: Benefit) {
        self.benefits.lock().unwrap().push(benefit);
    }

    /// Number of trait calls made so far (reads and writes).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every trait call fail with a backend error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make only `insert_if_absent` fail, so a scan can verify and then
    /// fail at commit time.
    pub fn set_inserts_unavailable(&self, unavailable: bool) {
        self.inserts_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every stored redemption in insertion order.
    pub fn redemptions(&self) -> Vec<Redemption> {
        self.redemptions.lock().unwrap().records.clone()
    }

    fn enter(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store set unavailable".into()));
        }
        Ok(())
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(mut records: Vec<Redemption>) -> Vec<Redemption> {
    records.sort_by(|a, b| b.used_at.cmp(&a.used_at).then(b.id.cmp(&a.id)));
    records
}

impl MembershipStore for NullStore {
    fn get_member(&self, id: &MemberId) -> Result<Option<Member>, StoreError> {
        self.enter()?;
        Ok(self.members.lock().unwrap().get(id).cloned())
    }
}

impl BenefitStore for NullStore {
    fn list_by_business(&self, business: &BusinessId) -> Result<Vec<Benefit>, StoreError> {
        self.enter()?;
        Ok(self
            .benefits
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.business_id == *business)
            .cloned()
            .collect())
    }
}

impl RedemptionStore for NullStore {
    fn find_recent(
        &self,
        member: &MemberId,
        business: &BusinessId,
        since: Timestamp,
    ) -> Result<Vec<Redemption>, StoreError> {
        self.enter()?;
        let log = self.redemptions.lock().unwrap();
        Ok(newest_first(
            log.records
                .iter()
                .filter(|r| r.member_id == *member && r.business_id == *business)
                .filter(|r| r.used_at >= since)
                .cloned()
                .collect(),
        ))
    }

    fn insert_if_absent(
        &self,
        redemption: NewRedemption,
        window_secs: u64,
    ) -> Result<InsertOutcome, StoreError> {
        self.enter()?;
        if self.inserts_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store inserts set unavailable".into()));
        }

        let mut log = self.redemptions.lock().unwrap();
        let conflict = log
            .records
            .iter()
            .filter(|r| {
                r.member_id == redemption.member_id && r.business_id == redemption.business_id
            })
            .filter(|r| r.blocks(window_secs, redemption.used_at))
            .max_by_key(|r| r.used_at)
            .cloned();
        if let Some(existing) = conflict {
            return Ok(InsertOutcome::Conflict(existing));
        }

        log.next_id += 1;
        let record = redemption.into_redemption(RedemptionId::new(log.next_id));
        log.records.push(record.clone());
        Ok(InsertOutcome::Inserted(record))
    }

    fn list_redemptions_by_business(
        &self,
        business: &BusinessId,
        since: Timestamp,
    ) -> Result<Vec<Redemption>, StoreError> {
        self.enter()?;
        let log = self.redemptions.lock().unwrap();
        Ok(newest_first(
            log.records
                .iter()
                .filter(|r| r.business_id == *business && r.used_at >= since)
                .cloned()
                .collect(),
        ))
    }

    fn list_by_member(&self, member: &MemberId) -> Result<Vec<Redemption>, StoreError> {
        self.enter()?;
        let log = self.redemptions.lock().unwrap();
        Ok(newest_first(
            log.records
                .iter()
                .filter(|r| r.member_id == *member)
                .cloned()
                .collect(),
        ))
    }

    fn void_redemption(&self, id: RedemptionId) -> Result<Redemption, StoreError> {
        self.enter()?;
        let mut log = self.redemptions.lock().unwrap();
        let record = log
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("redemption {id}")))?;
        record.status = RedemptionStatus::Voided;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perkpass_types::{BenefitId, MembershipType};

    fn new_redemption(member: MemberId, business: BusinessId, at: u64) -> NewRedemption {
        NewRedemption {
            member_id: member,
            benefit_id: BenefitId::new(1),
            business_id: business,
            used_at: Timestamp::new(at),
        }
    }

    #[test]
    fn get_member_round_trips() {
        let store = NullStore::new();
        let member = Member::provision(
            MemberId::random(),
            "a@example.com",
            "Ana",
            MembershipType::Resident,
            Timestamp::new(0),
        );
        store.put_member(member.clone());
        assert_eq!(store.get_member(&member.id).unwrap(), Some(member));
        assert_eq!(store.get_member(&MemberId::random()).unwrap(), None);
        assert_eq!(store.call_count(), 2);
    }

    #[test]
    fn conditional_insert_conflicts_inside_window() {
        let store = NullStore::new();
        let (m, b) = (MemberId::random(), BusinessId::random());

        let first = store.insert_if_absent(new_redemption(m, b, 1_000), 100).unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let second = store.insert_if_absent(new_redemption(m, b, 1_050), 100).unwrap();
        assert!(matches!(second, InsertOutcome::Conflict(ref r) if r.used_at == Timestamp::new(1_000)));

        let third = store.insert_if_absent(new_redemption(m, b, 1_100), 100).unwrap();
        assert!(matches!(third, InsertOutcome::Inserted(_)));
        assert_eq!(store.redemptions().len(), 2);
    }

    #[test]
    fn voided_redemption_does_not_conflict() {
        let store = NullStore::new();
        let (m, b) = (MemberId::random(), BusinessId::random());
        let InsertOutcome::Inserted(first) =
            store.insert_if_absent(new_redemption(m, b, 1_000), 100).unwrap()
        else {
            panic!("expected insert");
        };
        store.void_redemption(first.id).unwrap();
        let again = store.insert_if_absent(new_redemption(m, b, 1_010), 100).unwrap();
        assert!(matches!(again, InsertOutcome::Inserted(_)));
    }

    #[test]
    fn unavailable_store_fails_every_call() {
        let store = NullStore::new();
        store.set_unavailable(true);
        assert!(store.get_member(&MemberId::random()).is_err());
        assert!(store.list_by_business(&BusinessId::random()).is_err());
        assert!(store
            .list_redemptions_by_business(&BusinessId::random(), Timestamp::EPOCH)
            .is_err());
    }

    #[test]
    fn listings_are_newest_first() {
        let store = NullStore::new();
        let b = BusinessId::random();
        for at in [100u64, 300, 200] {
            store
                .insert_if_absent(new_redemption(MemberId::random(), b, at), 10)
                .unwrap();
        }
        let times: Vec<u64> = store
            .list_redemptions_by_business(&b, Timestamp::new(150))
            .unwrap()
            .iter()
            .map(|r| r.used_at.as_secs())
            .collect();
        assert_eq!(times, vec![300, 200]);
    }
}
