use cidfeed_audit::AuditError;
use cidfeed_credentials::IdentityError;
use cidfeed_delegation::DelegationError;
use cidfeed_revocation::RevocationError;
use thiserror::Error;

use crate::SettingsError;

/// The common error type used by this crate
#[derive(Debug, Error)]
pub enum SessionError {
    /// An operation needs a local identity and none exists
    #[error("No identity has been created")]
    NoIdentity,

    /// Identity creation failed
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// A delegation could not be issued
    #[error(transparent)]
    Delegation(#[from] DelegationError),

    /// A ledger, queue or retry operation was rejected
    #[error(transparent)]
    Revocation(#[from] RevocationError),

    /// An audit entry could not be recorded
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Settings were rejected
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// State could not be encoded as JSON
    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),

    /// The persistence collaborator failed
    #[error("State store failed: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}
