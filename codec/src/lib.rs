//! Membership QR code format.
//!
//! A membership code is the standard-base64 encoding of
//! `{member_id}|{issued_at_millis}|{nonce}`:
//!
//! - `member_id`: the member's hyphenated UUID (36 characters)
//! - `issued_at_millis`: Unix milliseconds at issuance
//! - `nonce`: short random token distinguishing codes issued in the same millisecond
//!
//! The pipe cannot occur in any field, so splitting is unambiguous. Decoding
//! is strict and pure: it performs no I/O and rejects every other layout.

pub mod codec;
pub mod error;
pub mod token;

pub use codec::{decode, encode, issue, DELIMITER, MAX_CODE_LEN};
pub use error::DecodeError;
pub use token::BearerToken;
