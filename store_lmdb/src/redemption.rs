//! LMDB implementation of RedemptionStore.
//!
//! Records live in `redemptions` keyed by id. Three secondary indexes hold
//! empty values under `prefix ++ used_at ++ id` keys:
//!
//! - `redemptions_by_pair`: prefix `member ++ business`
//! - `redemptions_by_business`: prefix `business`
//! - `redemptions_by_member`: prefix `member`
//!
//! Index scans ascend in time, so listings are reversed for newest-first.

use std::ops::Bound;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use perkpass_store::{InsertOutcome, RedemptionStore, StoreError};
use perkpass_types::{
    BusinessId, MemberId, NewRedemption, Redemption, RedemptionId, RedemptionStatus, Timestamp,
};

use crate::keys::{increment_prefix, pair_prefix, timed_key, timed_lower_bound, trailing_id};
use crate::LmdbError;

const NEXT_REDEMPTION_ID_KEY: &[u8] = b"next_redemption_id";

pub struct LmdbRedemptionStore {
    pub(crate) env: Arc<Env>,
    pub(crate) redemptions_db: Database<Bytes, Bytes>,
    pub(crate) pair_index_db: Database<Bytes, Bytes>,
    pub(crate) business_index_db: Database<Bytes, Bytes>,
    pub(crate) member_index_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

/// Ids under `prefix` whose time component is at or after `since`, oldest first.
fn scan_ids(
    db: &Database<Bytes, Bytes>,
    txn: &RoTxn<'_>,
    prefix: &[u8],
    since: Timestamp,
) -> Result<Vec<RedemptionId>, LmdbError> {
    let lower = timed_lower_bound(prefix, since);
    let mut upper = prefix.to_vec();
    let upper_bound = if increment_prefix(&mut upper) {
        Bound::Excluded(upper.as_slice())
    } else {
        Bound::Unbounded
    };
    let bounds = (Bound::Included(lower.as_slice()), upper_bound);
    let mut ids = Vec::new();
    for result in db.range(txn, &bounds)? {
        let (key, _) = result?;
        let id = trailing_id(key)
            .ok_or_else(|| LmdbError::Serialization(format!("short index key ({} bytes)", key.len())))?;
        ids.push(id);
    }
    Ok(ids)
}

impl LmdbRedemptionStore {
    fn load(&self, txn: &RoTxn<'_>, id: RedemptionId) -> Result<Redemption, LmdbError> {
        let bytes = self
            .redemptions_db
            .get(txn, &id.get().to_be_bytes())?
            .ok_or_else(|| LmdbError::NotFound(format!("redemption {id}")))?;
        Ok(bincode::deserialize(bytes)?)
    }

    fn load_newest_first(
        &self,
        txn: &RoTxn<'_>,
        ids: Vec<RedemptionId>,
    ) -> Result<Vec<Redemption>, LmdbError> {
        ids.into_iter().rev().map(|id| self.load(txn, id)).collect()
    }

    fn read_newest_first(
        &self,
        db: &Database<Bytes, Bytes>,
        prefix: &[u8],
        since: Timestamp,
    ) -> Result<Vec<Redemption>, LmdbError> {
        let rtxn = self.env.read_txn()?;
        let ids = scan_ids(db, &rtxn, prefix, since)?;
        self.load_newest_first(&rtxn, ids)
    }

    fn next_id(&self, txn: &RoTxn<'_>) -> Result<RedemptionId, LmdbError> {
        let last = match self.meta_db.get(txn, NEXT_REDEMPTION_ID_KEY)? {
            None => 0,
            Some(bytes) => {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("redemption counter is not 8 bytes".into())
                })?;
                u64::from_be_bytes(arr)
            }
        };
        Ok(RedemptionId::new(last + 1))
    }

    fn insert_locked(
        &self,
        redemption: NewRedemption,
        window_secs: u64,
    ) -> Result<InsertOutcome, LmdbError> {
        // The write transaction is held across the conflict scan and the
        // puts; LMDB serializes writers, so no other insert can interleave.
        let mut wtxn = self.env.write_txn()?;
        let pair = pair_prefix(&redemption.member_id, &redemption.business_id);
        let since = redemption.used_at.minus_secs(window_secs);

        let candidates = scan_ids(&self.pair_index_db, &wtxn, &pair, since)?;
        let mut conflict: Option<Redemption> = None;
        for id in candidates {
            let existing = self.load(&wtxn, id)?;
            if existing.blocks(window_secs, redemption.used_at)
                && conflict.as_ref().map_or(true, |c| existing.used_at >= c.used_at)
            {
                conflict = Some(existing);
            }
        }
        if let Some(existing) = conflict {
            wtxn.abort();
            return Ok(InsertOutcome::Conflict(existing));
        }

        let id = self.next_id(&wtxn)?;
        let record = redemption.into_redemption(id);
        let bytes = bincode::serialize(&record)?;
        let id_be = id.get().to_be_bytes();

        self.redemptions_db.put(&mut wtxn, &id_be, &bytes)?;
        self.pair_index_db
            .put(&mut wtxn, &timed_key(&pair, record.used_at, id), &[])?;
        self.business_index_db.put(
            &mut wtxn,
            &timed_key(record.business_id.as_bytes(), record.used_at, id),
            &[],
        )?;
        self.member_index_db.put(
            &mut wtxn,
            &timed_key(record.member_id.as_bytes(), record.used_at, id),
            &[],
        )?;
        self.meta_db.put(&mut wtxn, NEXT_REDEMPTION_ID_KEY, &id_be)?;
        wtxn.commit()?;

        tracing::debug!(
            redemption = %id,
            member = %record.member_id,
            business = %record.business_id,
            "redemption persisted"
        );
        Ok(InsertOutcome::Inserted(record))
    }

    fn void_locked(&self, id: RedemptionId) -> Result<Redemption, LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        let mut record = self.load(&wtxn, id)?;
        record.status = RedemptionStatus::Voided;
        let bytes = bincode::serialize(&record)?;
        self.redemptions_db
            .put(&mut wtxn, &id.get().to_be_bytes(), &bytes)?;
        wtxn.commit()?;
        tracing::info!(redemption = %id, "redemption voided");
        Ok(record)
    }
}

impl RedemptionStore for LmdbRedemptionStore {
    fn find_recent(
        &self,
        member: &MemberId,
        business: &BusinessId,
        since: Timestamp,
    ) -> Result<Vec<Redemption>, StoreError> {
        let pair = pair_prefix(member, business);
        Ok(self.read_newest_first(&self.pair_index_db, &pair, since)?)
    }

    fn insert_if_absent(
        &self,
        redemption: NewRedemption,
        window_secs: u64,
    ) -> Result<InsertOutcome, StoreError> {
        Ok(self.insert_locked(redemption, window_secs)?)
    }

    fn list_redemptions_by_business(
        &self,
        business: &BusinessId,
        since: Timestamp,
    ) -> Result<Vec<Redemption>, StoreError> {
        Ok(self.read_newest_first(&self.business_index_db, business.as_bytes(), since)?)
    }

    fn list_by_member(&self, member: &MemberId) -> Result<Vec<Redemption>, StoreError> {
        Ok(self.read_newest_first(&self.member_index_db, member.as_bytes(), Timestamp::EPOCH)?)
    }

    fn void_redemption(&self, id: RedemptionId) -> Result<Redemption, StoreError> {
        Ok(self.void_locked(id)?)
    }
}
