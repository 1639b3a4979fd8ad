use crate::{SessionError, Settings};
use cidfeed_audit::{AuditEvent, SecurityAuditEntry, SecurityAuditLog};
use cidfeed_common::Timestamp;
use cidfeed_credentials::{Identity, IdentityHandle, IdentityKey, format_handle};
use cidfeed_delegation::{DelegationGrant, GrantStatus, RevocationId};
use cidfeed_revocation::{
    FailedFlushRetries, OfflineRevocationEntry, OfflineRevocationQueue, PolicyVerdict,
    RevocationLedger, TrustedIssuerSet,
};

/// Grants sorted by how close they are to the end of their life.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpiryReport {
    /// Revocation ids of grants past their expiry.
    pub expired: Vec<RevocationId>,
    /// Revocation ids of live grants within the expiring-soon threshold.
    pub expiring_soon: Vec<RevocationId>,
}

/// The single authoritative copy of a device's security state.
///
/// Every aggregate is a plain value. Each transition computes its new values
/// and its audit entry first and only then replaces the old ones, so a
/// failed transition leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityState {
    pub(crate) settings: Settings,
    pub(crate) identity: Option<IdentityHandle>,
    pub(crate) ledger: RevocationLedger,
    pub(crate) offline_queue: OfflineRevocationQueue,
    pub(crate) flush_retries: FailedFlushRetries,
    pub(crate) audit_log: SecurityAuditLog,
    pub(crate) trusted_issuers: TrustedIssuerSet,
}

impl SecurityState {
    /// Fresh state: no identity, an empty ledger stamped `now`, nothing
    /// queued and nothing trusted.
    #[must_use]
    pub fn new(settings: Settings, now: Timestamp) -> Self {
        Self {
            settings,
            identity: None,
            ledger: RevocationLedger::empty(now),
            offline_queue: OfflineRevocationQueue::new(),
            flush_retries: FailedFlushRetries::new(),
            audit_log: SecurityAuditLog::new(),
            trusted_issuers: TrustedIssuerSet::new(),
        }
    }

    /// Getter for the `settings` field.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Getter for the `identity` field.
    #[must_use]
    pub const fn identity(&self) -> Option<&IdentityHandle> {
        self.identity.as_ref()
    }

    /// Getter for the `ledger` field.
    #[must_use]
    pub const fn ledger(&self) -> &RevocationLedger {
        &self.ledger
    }

    /// Getter for the `offline_queue` field.
    #[must_use]
    pub const fn offline_queue(&self) -> &OfflineRevocationQueue {
        &self.offline_queue
    }

    /// Getter for the `flush_retries` field.
    #[must_use]
    pub const fn flush_retries(&self) -> &FailedFlushRetries {
        &self.flush_retries
    }

    /// Getter for the `audit_log` field.
    #[must_use]
    pub const fn audit_log(&self) -> &SecurityAuditLog {
        &self.audit_log
    }

    /// Getter for the `trusted_issuers` field.
    #[must_use]
    pub const fn trusted_issuers(&self) -> &TrustedIssuerSet {
        &self.trusted_issuers
    }

    /// Creates a new local identity, replacing any existing one.
    ///
    /// Only the public handle is kept in the state. The returned
    /// [`Identity`] carries the keypair, which stays with the caller.
    ///
    /// # Errors
    ///
    /// Fails if no randomness is available.
    pub fn create_identity(&mut self, now: Timestamp) -> Result<Identity, SessionError> {
        let identity = Identity::create(now)?;
        let entry = audit_entry(
            AuditEvent::IdentityCreated,
            format!("Created identity {}", format_handle(identity.id())),
            now,
        )?;
        self.identity = Some(identity.handle().clone());
        self.append_audit(entry);
        Ok(identity)
    }

    /// Forgets the local identity, returning its handle. Clearing when there
    /// is no identity is a no-op and records nothing.
    ///
    /// # Errors
    ///
    /// Fails if the audit entry cannot be minted.
    pub fn clear_identity(
        &mut self,
        now: Timestamp,
    ) -> Result<Option<IdentityHandle>, SessionError> {
        let Some(handle) = &self.identity else {
            return Ok(None);
        };
        let entry = audit_entry(
            AuditEvent::IdentityCleared,
            format!("Cleared identity {}", format_handle(handle.id())),
            now,
        )?;
        self.append_audit(entry);
        Ok(self.identity.take())
    }

    /// Issues a grant from the local identity to `audience`.
    ///
    /// `ttl_seconds` falls back to [`Settings::default_ttl_seconds`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoIdentity`] without a local identity, or the
    /// [`cidfeed_delegation::DelegationError`] the request violates.
    pub fn issue_delegation<R, A>(
        &mut self,
        audience: &str,
        capabilities: impl IntoIterator<Item = (R, A)>,
        ttl_seconds: Option<u64>,
        now: Timestamp,
    ) -> Result<DelegationGrant, SessionError>
    where
        R: Into<String>,
        A: Into<String>,
    {
        let issuer = self.identity.as_ref().ok_or(SessionError::NoIdentity)?;
        let grant = capabilities
            .into_iter()
            .fold(
                DelegationGrant::builder().issuer(issuer.id()).audience(audience),
                |builder, (resource, action)| builder.capability(resource, action),
            )
            .ttl_seconds(ttl_seconds.unwrap_or(self.settings.default_ttl_seconds))
            .issued_at(now)
            .try_build()?;

        let entry = audit_entry(
            AuditEvent::DelegationCreated,
            format!(
                "Delegated {} capabilities to {} until {}",
                grant.capabilities().len(),
                format_handle(grant.audience()),
                display_time(grant.expires_at()),
            ),
            now,
        )?;
        self.append_audit(entry);
        Ok(grant)
    }

    /// Checks `grant` against the local ledger.
    ///
    /// # Errors
    ///
    /// Fails if the audit entry cannot be minted.
    pub fn verify_grant(
        &mut self,
        grant: &DelegationGrant,
        now: Timestamp,
    ) -> Result<GrantStatus, SessionError> {
        let status = grant.verify_against_ledger(&self.ledger, now);
        let entry = audit_entry(
            AuditEvent::DelegationVerified,
            format!("Grant {} is {status}", grant.revocation_id()),
            now,
        )?;
        self.append_audit(entry);
        Ok(status)
    }

    /// Sorts `grants` by remaining life. Every expired grant is audited;
    /// revoked grants are ignored.
    ///
    /// # Errors
    ///
    /// Fails if an audit entry cannot be minted.
    pub fn check_expiry(
        &mut self,
        grants: &[DelegationGrant],
        now: Timestamp,
    ) -> Result<ExpiryReport, SessionError> {
        let threshold = self.settings.expiring_soon_threshold();
        let mut report = ExpiryReport::default();
        for grant in grants {
            match grant.verify_against_ledger(&self.ledger, now) {
                GrantStatus::Revoked => {}
                GrantStatus::Expired => report.expired.push(grant.revocation_id().clone()),
                GrantStatus::Active if grant.is_expiring_soon(threshold, now) => {
                    report.expiring_soon.push(grant.revocation_id().clone());
                }
                GrantStatus::Active => {}
            }
        }

        let entries = report
            .expired
            .iter()
            .map(|revocation_id| {
                audit_entry(
                    AuditEvent::DelegationExpired,
                    format!("Grant {revocation_id} expired"),
                    now,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        for entry in entries {
            self.append_audit(entry);
        }
        Ok(report)
    }

    /// Revokes a grant by its revocation id: records it in the ledger
    /// (clearing the ledger signature) and queues it for propagation.
    ///
    /// # Errors
    ///
    /// Fails for a blank id or reason, or if the audit entry cannot be
    /// minted.
    pub fn revoke(
        &mut self,
        revocation_id: impl Into<RevocationId>,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), SessionError> {
        let revocation_id = revocation_id.into();
        let ledger = self
            .ledger
            .clone()
            .record_revocation(revocation_id.clone(), reason, now)?;
        let queued = OfflineRevocationEntry::new(revocation_id.clone(), reason, now)?;
        let entry = audit_entry(
            AuditEvent::DelegationRevoked,
            format!("Revoked {revocation_id}: {}", queued.reason()),
            now,
        )?;

        self.ledger = ledger;
        self.offline_queue = std::mem::take(&mut self.offline_queue).enqueue(queued);
        self.append_audit(entry);
        Ok(())
    }

    /// Shorthand for revoking `grant`'s revocation id.
    ///
    /// # Errors
    ///
    /// See [`SecurityState::revoke`].
    pub fn revoke_grant(
        &mut self,
        grant: &DelegationGrant,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), SessionError> {
        self.revoke(grant.revocation_id().clone(), reason, now)
    }

    /// Signs the local ledger with `key`.
    ///
    /// # Errors
    ///
    /// Fails if the key's id is not a valid identity id or the ledger cannot
    /// be canonicalized.
    pub fn sign_ledger(&mut self, key: &IdentityKey) -> Result<(), SessionError> {
        self.ledger = self.ledger.clone().sign(key)?;
        Ok(())
    }

    /// Judges the local ledger against the trusted issuers.
    ///
    /// # Errors
    ///
    /// Fails if the audit entry cannot be minted.
    pub fn evaluate_ledger(&mut self, now: Timestamp) -> Result<PolicyVerdict, SessionError> {
        let ledger = self.ledger.clone();
        self.evaluate_received_ledger(&ledger, now)
    }

    /// Judges a ledger received from elsewhere against the trusted issuers.
    ///
    /// # Errors
    ///
    /// Fails if the audit entry cannot be minted.
    pub fn evaluate_received_ledger(
        &mut self,
        ledger: &RevocationLedger,
        now: Timestamp,
    ) -> Result<PolicyVerdict, SessionError> {
        let verdict = ledger.evaluate_policy(&self.trusted_issuers);
        let issuer = ledger
            .issuer_id()
            .map_or_else(|| String::from("no issuer"), format_handle);
        let entry = audit_entry(
            AuditEvent::RevocationVerified,
            format!(
                "Ledger of {} entries from {issuer} is {verdict}",
                ledger.len()
            ),
            now,
        )?;
        self.append_audit(entry);
        Ok(verdict)
    }

    /// Trusts `issuer_id` to sign revocation ledgers.
    ///
    /// # Errors
    ///
    /// Fails if `issuer_id` is not a valid identity id.
    pub fn trust_issuer(&mut self, issuer_id: &str) -> Result<(), SessionError> {
        self.trusted_issuers = self.trusted_issuers.clone().add(issuer_id)?;
        Ok(())
    }

    /// Stops trusting `issuer_id`.
    pub fn distrust_issuer(&mut self, issuer_id: &str) {
        self.trusted_issuers = std::mem::take(&mut self.trusted_issuers).remove(issuer_id);
    }

    pub(crate) fn append_audit(&mut self, entry: SecurityAuditEntry) {
        self.audit_log =
            std::mem::take(&mut self.audit_log).append(entry, self.settings.audit_max_entries);
    }
}

pub(crate) fn audit_entry(
    event: AuditEvent,
    detail: String,
    now: Timestamp,
) -> Result<SecurityAuditEntry, SessionError> {
    Ok(SecurityAuditEntry::new(event, detail, now)?)
}

fn display_time(timestamp: Timestamp) -> String {
    timestamp
        .to_iso8601()
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidfeed_credentials::IdentityKey;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    const NOW: Timestamp = Timestamp::from_millis(1_700_000_000_000);

    fn state() -> SecurityState {
        SecurityState::new(Settings::default(), NOW)
    }

    #[test]
    fn issuing_needs_an_identity() {
        let mut state = state();
        let audience = IdentityKey::import(&[1; 32]);
        let result = state.issue_delegation(audience.id(), [("feed", "read")], None, NOW);
        assert!(matches!(result, Err(SessionError::NoIdentity)));
        assert!(state.audit_log().is_empty());
    }

    #[test]
    fn failed_transitions_leave_state_untouched() -> TestResult {
        let mut state = state();
        state.create_identity(NOW)?;
        let before = state.clone();

        let audience = IdentityKey::import(&[1; 32]);
        assert!(
            state
                .issue_delegation(audience.id(), [("feed", "read")], Some(30), NOW)
                .is_err()
        );
        assert!(state.revoke("revoke-1", " ", NOW).is_err());
        assert!(state.trust_issuer("mallory").is_err());
        assert_eq!(state, before);
        Ok(())
    }

    #[test]
    fn clearing_without_an_identity_records_nothing() -> TestResult {
        let mut state = state();
        assert_eq!(state.clear_identity(NOW)?, None);
        assert!(state.audit_log().is_empty());

        let identity = state.create_identity(NOW)?;
        assert_eq!(state.clear_identity(NOW)?.as_ref(), Some(identity.handle()));
        assert_eq!(state.identity(), None);
        assert_eq!(
            state.audit_log().latest().map(|e| e.event()),
            Some(AuditEvent::IdentityCleared)
        );
        Ok(())
    }

    #[test]
    fn revoked_grants_are_not_reported_as_expired() -> TestResult {
        let mut state = state();
        state.create_identity(NOW)?;
        let audience = IdentityKey::import(&[1; 32]);
        let short = state.issue_delegation(audience.id(), [("feed", "read")], Some(60), NOW)?;
        let revoked = state.issue_delegation(audience.id(), [("feed", "read")], Some(60), NOW)?;
        let long = state.issue_delegation(audience.id(), [("feed", "read")], Some(600), NOW)?;
        state.revoke_grant(&revoked, "left", NOW)?;

        let later = Timestamp::from_millis(NOW.as_millis() + 320_000);
        let report = state.check_expiry(&[short.clone(), revoked, long.clone()], later)?;
        assert_eq!(report.expired, vec![short.revocation_id().clone()]);
        assert_eq!(report.expiring_soon, vec![long.revocation_id().clone()]);
        assert_eq!(state.audit_log().of_kind(AuditEvent::DelegationExpired).count(), 1);
        Ok(())
    }
}
