use cidfeed_common::EncodeError;
use thiserror::Error;

/// The common error type used by this crate
#[derive(Debug, Error)]
pub enum RevocationError {
    /// A revocation id was empty or whitespace only
    #[error("Revocation id must be non-empty")]
    EmptyIdentifier,

    /// A revocation reason was empty or whitespace only
    #[error("Revocation reason must be non-empty")]
    EmptyReason,

    /// A persisted retry record claimed zero failures
    #[error("Retry count must be at least one")]
    ZeroRetryCount,

    /// An issuer id is not a valid identity id
    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    /// The ledger content could not be canonicalized for signing
    #[error("Failed to canonicalize ledger: {0}")]
    Canonicalize(String),

    /// JSON encoding failed
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
