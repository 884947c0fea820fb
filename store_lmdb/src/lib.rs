//! LMDB storage backend for PerkPass.
//!
//! Implements the storage traits from `perkpass-store` using the `heed`
//! LMDB bindings. Each logical store maps to one or more LMDB databases
//! within a single environment.
//!
//! LMDB admits one write transaction at a time per environment, which is
//! what makes [`LmdbRedemptionStore`]'s conditional insert atomic across
//! every terminal sharing the environment.

pub mod benefit;
pub mod environment;
pub mod error;
pub mod keys;
pub mod membership;
pub mod migration;
pub mod redemption;

pub use benefit::LmdbBenefitStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use membership::LmdbMembershipStore;
pub use redemption::LmdbRedemptionStore;
