//! LMDB implementation of MembershipStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use perkpass_store::{MembershipStore, StoreError};
use perkpass_types::{Member, MemberId};

use crate::LmdbError;

pub struct LmdbMembershipStore {
    pub(crate) env: Arc<Env>,
    pub(crate) members_db: Database<Bytes, Bytes>,
}

impl LmdbMembershipStore {
    /// Insert or replace a member record.
    pub fn put_member(&self, member: &Member) -> Result<(), StoreError> {
        let bytes = bincode::serialize(member).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.members_db
            .put(&mut wtxn, member.id.as_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl MembershipStore for LmdbMembershipStore {
    fn get_member(&self, id: &MemberId) -> Result<Option<Member>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let Some(bytes) = self
            .members_db
            .get(&rtxn, id.as_bytes())
            .map_err(LmdbError::from)?
        else {
            return Ok(None);
        };
        let member = bincode::deserialize(bytes).map_err(LmdbError::from)?;
        Ok(Some(member))
    }
}
