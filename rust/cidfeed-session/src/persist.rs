use crate::{SecurityState, SessionError, Settings, StateStore};
use cidfeed_audit::SecurityAuditLog;
use cidfeed_common::Timestamp;
use cidfeed_credentials::IdentityHandle;
use cidfeed_revocation::{
    FailedFlushRetries, OfflineRevocationQueue, RevocationLedger, TrustedIssuerSet,
};

/// Store key of the identity handle.
pub const IDENTITY_KEY: &str = "cidfeed.identity";
/// Store key of the revocation ledger.
pub const LEDGER_KEY: &str = "cidfeed.ledger";
/// Store key of the offline revocation queue.
pub const OFFLINE_QUEUE_KEY: &str = "cidfeed.offlineQueue";
/// Store key of the flush retry records.
pub const FLUSH_RETRIES_KEY: &str = "cidfeed.flushRetries";
/// Store key of the audit log.
pub const AUDIT_LOG_KEY: &str = "cidfeed.auditLog";
/// Store key of the trusted issuer set.
pub const TRUSTED_ISSUERS_KEY: &str = "cidfeed.trustedIssuers";
/// Store key of the settings.
pub const SETTINGS_KEY: &str = "cidfeed.settings";

fn store_error<E>(error: E) -> SessionError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SessionError::Store(Box::new(error))
}

impl SecurityState {
    /// Restores state from `store`.
    ///
    /// Persisted blobs are untrusted: an absent or malformed blob loads as
    /// the empty value for that aggregate (an empty ledger is stamped `now`),
    /// and malformed elements inside a list are dropped.
    ///
    /// # Errors
    ///
    /// Only a failing store is an error.
    pub async fn load<S>(store: &S, now: Timestamp) -> Result<Self, SessionError>
    where
        S: StateStore + ?Sized,
    {
        let blob = |key: &'static str| async move { store.get(key).await.map_err(store_error) };

        let settings = match blob(SETTINGS_KEY).await? {
            Some(json) => Settings::from_json(&json).unwrap_or_else(|error| {
                tracing::warn!(%error, "Discarding persisted settings");
                Settings::default()
            }),
            None => Settings::default(),
        };
        let identity = blob(IDENTITY_KEY)
            .await?
            .and_then(|json| IdentityHandle::parse(&json));
        let ledger = blob(LEDGER_KEY)
            .await?
            .and_then(|json| RevocationLedger::parse(&json))
            .unwrap_or_else(|| RevocationLedger::empty(now));
        let offline_queue = blob(OFFLINE_QUEUE_KEY)
            .await?
            .map(|json| OfflineRevocationQueue::parse(&json))
            .unwrap_or_default();
        let flush_retries = blob(FLUSH_RETRIES_KEY)
            .await?
            .map(|json| FailedFlushRetries::parse(&json))
            .unwrap_or_default();
        let audit_log = blob(AUDIT_LOG_KEY)
            .await?
            .map(|json| SecurityAuditLog::parse(&json))
            .unwrap_or_default();
        let trusted_issuers = blob(TRUSTED_ISSUERS_KEY)
            .await?
            .map(|json| TrustedIssuerSet::parse(&json))
            .unwrap_or_default();

        tracing::debug!(
            identity = identity.is_some(),
            revocations = ledger.len(),
            queued = offline_queue.len(),
            retries = flush_retries.len(),
            "Loaded security state"
        );

        Ok(Self {
            audit_log: audit_log.truncated(settings.audit_max_entries),
            settings,
            identity,
            ledger,
            offline_queue,
            flush_retries,
            trusted_issuers,
        })
    }

    /// Writes every aggregate to `store`. Without an identity the identity
    /// key is removed.
    ///
    /// # Errors
    ///
    /// Fails if encoding fails or the store rejects a write.
    pub async fn save<S>(&self, store: &S) -> Result<(), SessionError>
    where
        S: StateStore + ?Sized,
    {
        let blobs = [
            (SETTINGS_KEY, serde_json::to_string(&self.settings)?),
            (LEDGER_KEY, self.ledger.to_json()?),
            (OFFLINE_QUEUE_KEY, self.offline_queue.to_json()?),
            (FLUSH_RETRIES_KEY, self.flush_retries.to_json()?),
            (AUDIT_LOG_KEY, self.audit_log.to_json()?),
            (TRUSTED_ISSUERS_KEY, self.trusted_issuers.to_json()?),
        ];
        let identity = self
            .identity
            .as_ref()
            .map(IdentityHandle::to_json)
            .transpose()?;

        for (key, json) in blobs {
            store.set(key, json).await.map_err(store_error)?;
        }
        let written = match identity {
            Some(json) => store.set(IDENTITY_KEY, json).await,
            None => store.remove(IDENTITY_KEY).await,
        };
        written.map_err(store_error)?;

        tracing::debug!("Saved security state");
        Ok(())
    }
}
