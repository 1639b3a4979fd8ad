//! Error types for identity operations.

use cidfeed_common::EncodeError;
use thiserror::Error;

/// Errors from creating, importing or serializing an identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Random number generation failed.
    #[error("RNG error: {0}")]
    Rng(getrandom::Error),

    /// The seed bytes have the wrong length (expected 32).
    #[error("expected 32 seed bytes, got {0}")]
    InvalidSeedLength(usize),

    /// The handle could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl From<getrandom::Error> for IdentityError {
    fn from(e: getrandom::Error) -> Self {
        Self::Rng(e)
    }
}
