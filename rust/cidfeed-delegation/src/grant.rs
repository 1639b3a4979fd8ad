//! Delegation grants.

use crate::{Capability, DelegationBuilder, DelegationError, RevocationCheck, RevocationId};
use cidfeed_common::{Duration, Timestamp, decode, encode};
use cidfeed_credentials::is_valid_identity_id;
use serde::{Deserialize, Serialize};

/// Schema version written into every grant this crate issues.
pub const GRANT_SCHEMA_VERSION: u32 = 1;

/// A capability-scoped, time-bounded authorization from an issuer identity
/// to an audience identity.
///
/// Grants are never mutated after issuance. Revocation happens by recording
/// [`DelegationGrant::revocation_id`] in a revocation ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "DelegationGrantWire")]
pub struct DelegationGrant {
    pub(crate) issuer: String,
    pub(crate) audience: String,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) issued_at: Timestamp,
    pub(crate) expires_at: Timestamp,
    pub(crate) revocation_id: RevocationId,
    pub(crate) nonce: String,
    pub(crate) schema_version: u32,
}

/// Outcome of checking a grant against a revocation source at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    /// Neither revoked nor expired.
    Active,
    /// Past its expiry.
    Expired,
    /// Its revocation id has been revoked.
    Revoked,
}

impl GrantStatus {
    /// The lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Active => "active",
            GrantStatus::Expired => "expired",
            GrantStatus::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DelegationGrant {
    /// Creates a blank [`DelegationBuilder`] instance.
    #[must_use]
    pub fn builder() -> DelegationBuilder {
        DelegationBuilder::new()
    }

    /// Getter for the `issuer` field.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Getter for the `audience` field.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Getter for the `capabilities` field.
    #[must_use]
    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Getter for the `issued_at` field.
    #[must_use]
    pub const fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// Getter for the `expires_at` field.
    #[must_use]
    pub const fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    /// Getter for the `revocation_id` field.
    #[must_use]
    pub const fn revocation_id(&self) -> &RevocationId {
        &self.revocation_id
    }

    /// Getter for the `nonce` field.
    #[must_use]
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Getter for the `schema_version` field.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Expired at and after `expires_at`; the boundary instant counts as expired.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Time left until expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self, now: Timestamp) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// `true` while the grant is still live but has at most `threshold` left.
    #[must_use]
    pub fn is_expiring_soon(&self, threshold: Duration, now: Timestamp) -> bool {
        let remaining = self.remaining(now);
        !remaining.is_zero() && remaining <= threshold
    }

    /// Grants `action` on `resource`.
    #[must_use]
    pub fn allows(&self, resource: &str, action: &str) -> bool {
        self.capabilities
            .iter()
            .any(|capability| capability.resource() == resource && capability.action() == action)
    }

    /// Status of this grant according to `revocations` at `now`.
    ///
    /// Revocation wins over expiry: a grant that is both revoked and expired
    /// reports [`GrantStatus::Revoked`].
    #[must_use]
    pub fn verify_against_ledger<R>(&self, revocations: &R, now: Timestamp) -> GrantStatus
    where
        R: RevocationCheck + ?Sized,
    {
        if revocations.is_revoked(&self.revocation_id) {
            GrantStatus::Revoked
        } else if self.is_expired(now) {
            GrantStatus::Expired
        } else {
            GrantStatus::Active
        }
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, DelegationError> {
        Ok(encode("delegation grant", self)?)
    }

    /// Decode from JSON, yielding `None` for anything malformed or violating
    /// a grant invariant.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        decode("delegation grant", input)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DelegationGrantWire {
    issuer: String,
    audience: String,
    capabilities: Vec<Capability>,
    issued_at: Timestamp,
    expires_at: Timestamp,
    revocation_id: RevocationId,
    nonce: String,
    schema_version: u32,
}

impl TryFrom<DelegationGrantWire> for DelegationGrant {
    type Error = &'static str;

    fn try_from(wire: DelegationGrantWire) -> Result<Self, Self::Error> {
        if wire.schema_version != GRANT_SCHEMA_VERSION {
            return Err("unrecognized schema version");
        }
        if !is_valid_identity_id(&wire.issuer) || !is_valid_identity_id(&wire.audience) {
            return Err("invalid identity id");
        }
        if wire.capabilities.is_empty() {
            return Err("empty capability list");
        }
        if wire.expires_at <= wire.issued_at {
            return Err("expiry not after issuance");
        }
        if wire.revocation_id.is_blank() || wire.nonce.trim().is_empty() {
            return Err("blank revocation id or nonce");
        }
        Ok(Self {
            issuer: wire.issuer,
            audience: wire.audience,
            capabilities: wire.capabilities,
            issued_at: wire.issued_at,
            expires_at: wire.expires_at,
            revocation_id: wire.revocation_id,
            nonce: wire.nonce,
            schema_version: wire.schema_version,
        })
    }
}
