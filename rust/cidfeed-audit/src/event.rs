use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of security relevant transition.
///
/// Each variant serializes as a stable dotted name, e.g.
/// `"delegation.revoked"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditEvent {
    /// A new identity was created.
    #[serde(rename = "identity.created")]
    IdentityCreated,
    /// The local identity was discarded.
    #[serde(rename = "identity.cleared")]
    IdentityCleared,
    /// A delegation grant was issued.
    #[serde(rename = "delegation.created")]
    DelegationCreated,
    /// A delegation grant was revoked.
    #[serde(rename = "delegation.revoked")]
    DelegationRevoked,
    /// A delegation grant was found to be expired.
    #[serde(rename = "delegation.expired")]
    DelegationExpired,
    /// A delegation grant was checked against the ledger.
    #[serde(rename = "delegation.verified")]
    DelegationVerified,
    /// A revocation ledger was judged against the trust policy.
    #[serde(rename = "revocation.verified")]
    RevocationVerified,
    /// Queued revocations were replayed to the transport.
    #[serde(rename = "revocation.replayed")]
    RevocationReplayed,
}

impl AuditEvent {
    /// Every event kind, in declaration order.
    pub const ALL: [AuditEvent; 8] = [
        AuditEvent::IdentityCreated,
        AuditEvent::IdentityCleared,
        AuditEvent::DelegationCreated,
        AuditEvent::DelegationRevoked,
        AuditEvent::DelegationExpired,
        AuditEvent::DelegationVerified,
        AuditEvent::RevocationVerified,
        AuditEvent::RevocationReplayed,
    ];

    /// The dotted wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::IdentityCreated => "identity.created",
            AuditEvent::IdentityCleared => "identity.cleared",
            AuditEvent::DelegationCreated => "delegation.created",
            AuditEvent::DelegationRevoked => "delegation.revoked",
            AuditEvent::DelegationExpired => "delegation.expired",
            AuditEvent::DelegationVerified => "delegation.verified",
            AuditEvent::RevocationVerified => "revocation.verified",
            AuditEvent::RevocationReplayed => "revocation.replayed",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
