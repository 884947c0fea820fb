//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::migration::Migrator;
use crate::{LmdbBenefitStore, LmdbError, LmdbMembershipStore, LmdbRedemptionStore};

/// Named databases inside the environment.
pub const DATABASES: &[&str] = &[
    "members",
    "benefits",
    "redemptions",
    "redemptions_by_pair",
    "redemptions_by_business",
    "redemptions_by_member",
    "meta",
];

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    members_db: Database<Bytes, Bytes>,
    benefits_db: Database<Bytes, Bytes>,
    redemptions_db: Database<Bytes, Bytes>,
    pair_index_db: Database<Bytes, Bytes>,
    business_index_db: Database<Bytes, Bytes>,
    member_index_db: Database<Bytes, Bytes>,
    meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path and bring its
    /// schema up to date.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment directory is owned by this process; no
        // other handle to the same path is opened concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(DATABASES.len() as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let members_db = env.create_database(&mut wtxn, Some("members"))?;
        let benefits_db = env.create_database(&mut wtxn, Some("benefits"))?;
        let redemptions_db = env.create_database(&mut wtxn, Some("redemptions"))?;
        let pair_index_db = env.create_database(&mut wtxn, Some("redemptions_by_pair"))?;
        let business_index_db = env.create_database(&mut wtxn, Some("redemptions_by_business"))?;
        let member_index_db = env.create_database(&mut wtxn, Some("redemptions_by_member"))?;
        let meta_db = env.create_database(&mut wtxn, Some("meta"))?;
        wtxn.commit()?;

        Migrator::run(&env, meta_db)?;

        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            members_db,
            benefits_db,
            redemptions_db,
            pair_index_db,
            business_index_db,
            member_index_db,
            meta_db,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn membership_store(&self) -> LmdbMembershipStore {
        LmdbMembershipStore {
            env: Arc::clone(&self.env),
            members_db: self.members_db,
        }
    }

    pub fn benefit_store(&self) -> LmdbBenefitStore {
        LmdbBenefitStore {
            env: Arc::clone(&self.env),
            benefits_db: self.benefits_db,
        }
    }

    pub fn redemption_store(&self) -> LmdbRedemptionStore {
        LmdbRedemptionStore {
            env: Arc::clone(&self.env),
            redemptions_db: self.redemptions_db,
            pair_index_db: self.pair_index_db,
            business_index_db: self.business_index_db,
            member_index_db: self.member_index_db,
            meta_db: self.meta_db,
        }
    }

    /// Stored schema version.
    pub fn schema_version(&self) -> Result<u32, LmdbError> {
        let rtxn = self.env.read_txn()?;
        crate::migration::read_schema_version(&rtxn, self.meta_db)
    }

    /// Overwrite the stored schema version.
    #[cfg(test)]
    pub(crate) fn stamp_schema_version(&self, version: u32) -> Result<(), LmdbError> {
        crate::migration::write_schema_version(&self.env, self.meta_db, version)
    }

    /// Flush dirty pages to disk.
    pub fn sync(&self) -> Result<(), LmdbError> {
        self.env.force_sync()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::CURRENT_SCHEMA_VERSION;

    #[test]
    fn open_creates_directory_and_stamps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db");
        let env = LmdbEnvironment::open(&path, 10 << 20).unwrap();
        assert!(path.exists());
        assert_eq!(env.path(), path.as_path());
        assert_eq!(env.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    }
}
