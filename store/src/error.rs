use thiserror::Error;

/// Failure of a storage backend. The redemption core treats every variant
/// as the store being unavailable for the current attempt.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record addressed by id does not exist (e.g. voiding an unknown
    /// redemption). Absence on lookup is `Ok(None)`, not this.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backend could not be reached or failed mid-operation.
    #[error("store backend failure: {0}")]
    Backend(String),

    /// A stored record could not be encoded or decoded.
    #[error("record encoding failure: {0}")]
    Serialization(String),
}
