use cidfeed_common::EncodeError;
use thiserror::Error;

/// Errors from building or encoding audit entries.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The entry detail was empty or whitespace only.
    #[error("Audit detail must be non-empty")]
    EmptyDetail,

    /// Random number generation failed while minting an entry id.
    #[error("RNG error: {0}")]
    Rng(getrandom::Error),

    /// The log could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl From<getrandom::Error> for AuditError {
    fn from(e: getrandom::Error) -> Self {
        Self::Rng(e)
    }
}
