//! Nullable infrastructure for deterministic testing.
//!
//! External dependencies of the redemption core (clock and storage) are
//! abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (advance time, inject outages)
//! - Count every store call so tests can assert that no I/O happened
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullStore;
