//! Error types for delegation issuance.

use cidfeed_common::EncodeError;
use thiserror::Error;

/// Reasons a delegation cannot be issued.
///
/// These are caller contract violations: the request is rejected outright
/// and nothing is produced.
#[derive(Debug, Error)]
pub enum DelegationError {
    /// Issuer or audience is not a valid identity id.
    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    /// No capabilities were requested.
    #[error("A delegation needs at least one capability")]
    EmptyCapabilities,

    /// The requested lifetime falls outside the permitted window.
    #[error("TTL of {0}s is outside [60, 31536000]")]
    TtlOutOfRange(u64),

    /// A capability has an empty resource or action after trimming.
    #[error("Capability resource and action must be non-empty")]
    InvalidCapability,

    /// An explicitly supplied revocation id is blank.
    #[error("Revocation id must be non-empty")]
    EmptyRevocationId,

    /// An explicitly supplied nonce is blank.
    #[error("Nonce must be non-empty")]
    EmptyNonce,

    /// `issuedAt + ttl` does not fit in a timestamp.
    #[error("Expiry overflows the timestamp range")]
    ExpiryOverflow,

    /// Random number generation failed while minting a nonce.
    #[error("RNG error: {0}")]
    Rng(getrandom::Error),

    /// Canonical encoding of the grant content failed.
    #[error("Failed to encode grant content: {0}")]
    Canonicalize(String),

    /// JSON encoding failed.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl From<getrandom::Error> for DelegationError {
    fn from(e: getrandom::Error) -> Self {
        Self::Rng(e)
    }
}
