use thiserror::Error;

/// Why a scanned code could not be decoded. Always the scanning operator's
/// problem; never retried automatically.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("NotBase64: code is not valid base64 text")]
    NotBase64,

    #[error("TooLong: code is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },

    #[error("WrongArity: expected {expected} fields, found {found}")]
    WrongArity { expected: usize, found: usize },

    #[error("MalformedIdentity: member id {0:?} is not a hyphenated UUID")]
    MalformedIdentity(String),

    #[error("MalformedTimestamp: {0:?} is not a millisecond timestamp")]
    MalformedTimestamp(String),

    #[error("MalformedNonce: nonce must be non-empty")]
    MalformedNonce,
}
