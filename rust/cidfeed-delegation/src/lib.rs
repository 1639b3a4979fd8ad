//! Capability delegation between identities.
//!
//! A [`DelegationGrant`] lets an audience identity exercise a set of
//! [`Capability`]s on behalf of an issuer identity until an expiry. Grants are
//! immutable; they are revoked indirectly by publishing their
//! [`RevocationId`], and checked against any [`RevocationCheck`]
//! implementation with [`DelegationGrant::verify_against_ledger`].
//!
//! Every time-dependent question takes the current instant as an argument,
//! so the same inputs always produce the same answer.

mod builder;
mod capability;
mod error;
mod grant;
mod revocation;

pub use builder::{DEFAULT_TTL_SECONDS, DelegationBuilder, MAX_TTL_SECONDS, MIN_TTL_SECONDS};
pub use capability::Capability;
pub use error::DelegationError;
pub use grant::{DelegationGrant, GRANT_SCHEMA_VERSION, GrantStatus};
pub use revocation::{RevocationCheck, RevocationId};
