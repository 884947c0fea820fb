//! Abstract storage traits for PerkPass.
//!
//! Membership, benefit and redemption data live in a shared external store
//! accessed concurrently by many terminals. Every backend (LMDB, in-memory
//! for testing) implements these traits; the redemption core depends only
//! on the traits.

pub mod benefit;
pub mod error;
pub mod membership;
pub mod redemption;

pub use benefit::BenefitStore;
pub use error::StoreError;
pub use membership::MembershipStore;
pub use redemption::{InsertOutcome, RedemptionStore};
