//! Errors raised while constructing or parsing core types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid member id: {0}")]
    InvalidMemberId(String),

    #[error("invalid business id: {0}")]
    InvalidBusinessId(String),

    #[error("invalid numeric id: {0}")]
    InvalidNumericId(String),

    #[error("unknown membership type: {0}")]
    UnknownMembershipType(String),
}
