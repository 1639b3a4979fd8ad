use crate::{SecurityState, SessionError, Settings};
use cidfeed_audit::SecurityAuditLog;
use cidfeed_common::{Timestamp, decode};
use cidfeed_credentials::IdentityHandle;
use cidfeed_revocation::{
    FailedFlushRetries, OfflineRevocationQueue, RevocationLedger, TrustedIssuerSet,
};
use serde::{Deserialize, Serialize};

/// Version written into every exported snapshot.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A portable copy of a [`SecurityState`], e.g. for moving between devices.
///
/// Unlike loading from a store, importing is all or nothing: any malformed
/// part rejects the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecuritySnapshot {
    version: u32,
    exported_at: Timestamp,
    settings: Settings,
    identity: Option<IdentityHandle>,
    ledger: RevocationLedger,
    offline_queue: OfflineRevocationQueue,
    flush_retries: FailedFlushRetries,
    audit_log: SecurityAuditLog,
    trusted_issuers: TrustedIssuerSet,
}

impl SecuritySnapshot {
    /// Getter for the `version` field.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Getter for the `exported_at` field.
    #[must_use]
    pub const fn exported_at(&self) -> Timestamp {
        self.exported_at
    }

    /// Decode a snapshot, yielding `None` for anything malformed or for an
    /// unknown version.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let snapshot: Self = decode("security snapshot", input)?;
        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(version = snapshot.version, "Unsupported snapshot version");
            return None;
        }
        Some(snapshot)
    }

    /// Restore the captured state.
    #[must_use]
    pub fn into_state(self) -> SecurityState {
        SecurityState {
            audit_log: self.audit_log.truncated(self.settings.audit_max_entries),
            settings: self.settings,
            identity: self.identity,
            ledger: self.ledger,
            offline_queue: self.offline_queue,
            flush_retries: self.flush_retries,
            trusted_issuers: self.trusted_issuers,
        }
    }
}

impl SecurityState {
    /// Captures the whole state.
    #[must_use]
    pub fn snapshot(&self, now: Timestamp) -> SecuritySnapshot {
        SecuritySnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: now,
            settings: self.settings,
            identity: self.identity.clone(),
            ledger: self.ledger.clone(),
            offline_queue: self.offline_queue.clone(),
            flush_retries: self.flush_retries.clone(),
            audit_log: self.audit_log.clone(),
            trusted_issuers: self.trusted_issuers.clone(),
        }
    }

    /// Exports the whole state as a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Fails if JSON encoding fails.
    pub fn export(&self, now: Timestamp) -> Result<String, SessionError> {
        Ok(serde_json::to_string(&self.snapshot(now))?)
    }

    /// Imports a snapshot produced by [`SecurityState::export`].
    #[must_use]
    pub fn import(input: &str) -> Option<Self> {
        SecuritySnapshot::parse(input).map(SecuritySnapshot::into_state)
    }
}
