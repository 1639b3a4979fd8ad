//! End-to-end behaviour of a device's security state against in-memory
//! collaborators.

use std::collections::VecDeque;

use async_trait::async_trait;
use cidfeed_audit::AuditEvent;
use cidfeed_common::Timestamp;
use cidfeed_delegation::{GrantStatus, RevocationId};
use cidfeed_revocation::{FlushOutcome, OfflineRevocationEntry, PolicyVerdict, RetrySeverity};
use cidfeed_session::{
    AUDIT_LOG_KEY, LEDGER_KEY, MemoryStateStore, OFFLINE_QUEUE_KEY, RevocationFlush,
    SETTINGS_KEY, SecurityState, SessionError, Settings, StateStore, UNCONFIRMED_FLUSH_LABEL,
};
use pretty_assertions::assert_eq;
use testresult::TestResult;
use tokio::sync::Mutex;

const NOW: Timestamp = Timestamp::from_millis(1_700_000_000_000);

fn at(offset_ms: u64) -> Timestamp {
    Timestamp::from_millis(NOW.as_millis() + offset_ms)
}

fn ids(ids: &[&str]) -> Vec<RevocationId> {
    ids.iter().copied().map(RevocationId::from).collect()
}

/// A transport that replays scripted replies and remembers every batch.
struct ScriptedFlush {
    replies: Mutex<VecDeque<Result<FlushOutcome, String>>>,
    batches: Mutex<Vec<Vec<RevocationId>>>,
}

impl ScriptedFlush {
    fn new(replies: impl IntoIterator<Item = Result<FlushOutcome, String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            batches: Mutex::default(),
        }
    }

    async fn batches(&self) -> Vec<Vec<RevocationId>> {
        self.batches.lock().await.clone()
    }
}

#[async_trait]
impl RevocationFlush for ScriptedFlush {
    type Error = String;

    async fn flush(&self, batch: &[OfflineRevocationEntry]) -> Result<FlushOutcome, String> {
        self.batches.lock().await.push(
            batch
                .iter()
                .map(|entry| entry.revocation_id().clone())
                .collect(),
        );
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(String::from("no scripted reply")))
    }
}

fn state_with_revocations(revocation_ids: &[&str]) -> Result<SecurityState, SessionError> {
    let settings = Settings {
        retry_base_delay_ms: 10_000,
        replay_batch_size: 2,
        ..Settings::default()
    };
    let mut state = SecurityState::new(settings, NOW);
    for (offset, id) in revocation_ids.iter().enumerate() {
        state.revoke(*id, "key compromise", at(offset as u64))?;
    }
    Ok(state)
}

#[test_log::test(tokio::test)]
async fn replay_flushes_in_batches_and_acknowledges_confirmed_ids() -> TestResult {
    let mut state = state_with_revocations(&["revoke-1", "revoke-2", "revoke-3"])?;
    let flush = ScriptedFlush::new([
        Ok(FlushOutcome::all_flushed(ids(&["revoke-1", "revoke-2"]))),
        Ok(FlushOutcome::all_flushed(ids(&["revoke-3"]))),
    ]);

    let first = state.replay_offline(&flush, at(100)).await?;
    assert_eq!(first.attempted, ids(&["revoke-1", "revoke-2"]));
    assert_eq!(first.flushed, ids(&["revoke-1", "revoke-2"]));
    assert_eq!(state.offline_queue().len(), 1);

    let second = state.replay_offline(&flush, at(200)).await?;
    assert_eq!(second.flushed, ids(&["revoke-3"]));
    assert!(state.offline_queue().is_empty());
    assert!(state.flush_retries().is_empty());

    let idle = state.replay_offline(&flush, at(300)).await?;
    assert!(idle.is_idle());
    assert_eq!(flush.batches().await.len(), 2);
    assert_eq!(
        state
            .audit_log()
            .of_kind(AuditEvent::RevocationReplayed)
            .count(),
        2
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn partial_failures_stay_queued_with_linear_backoff() -> TestResult {
    let mut state = state_with_revocations(&["revoke-a", "revoke-b"])?;
    let flush = ScriptedFlush::new([
        Ok(FlushOutcome {
            flushed_ids: ids(&["revoke-b"]),
            failed_ids: ids(&["revoke-a"]),
        }),
        Err(String::from("network down")),
    ]);

    let report = state.replay_offline(&flush, at(1_000)).await?;
    assert_eq!(report.failed, ids(&["revoke-a"]));
    assert!(state.offline_queue().contains(&RevocationId::from("revoke-a")));
    assert!(!state.offline_queue().contains(&RevocationId::from("revoke-b")));

    let retry = state
        .flush_retries()
        .get(&RevocationId::from("revoke-a"))
        .cloned()
        .ok_or("retry recorded")?;
    assert_eq!(retry.retry_count(), 1);
    assert_eq!(retry.next_retry_at(), at(11_000));

    // Not due yet: nothing is offered.
    let report = state.replay_offline(&flush, at(5_000)).await?;
    assert!(report.is_idle());

    let report = state.replay_offline(&flush, at(11_000)).await?;
    assert_eq!(report.failed, ids(&["revoke-a"]));
    let retry = state
        .flush_retries()
        .get(&RevocationId::from("revoke-a"))
        .cloned()
        .ok_or("retry recorded")?;
    assert_eq!(retry.retry_count(), 2);
    assert_eq!(retry.next_retry_at(), at(31_000));
    assert_eq!(retry.last_error(), "network down");
    assert_eq!(retry.severity(), RetrySeverity::Low);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn ids_the_transport_ignores_are_retried() -> TestResult {
    let mut state = state_with_revocations(&["revoke-1", "revoke-2"])?;
    let flush = ScriptedFlush::new([Ok(FlushOutcome::all_flushed(ids(&[
        "revoke-1",
        "elsewhere",
    ])))]);

    let report = state.replay_offline(&flush, at(10)).await?;
    assert_eq!(report.flushed, ids(&["revoke-1"]));
    assert_eq!(report.failed, ids(&["revoke-2"]));
    assert_eq!(state.offline_queue().len(), 1);
    assert_eq!(
        state
            .flush_retries()
            .get(&RevocationId::from("revoke-2"))
            .map(|retry| retry.last_error()),
        Some(UNCONFIRMED_FLUSH_LABEL)
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn state_survives_a_save_and_load() -> TestResult {
    let store = MemoryStateStore::new();
    let mut state = SecurityState::new(Settings::default(), NOW);
    let identity = state.create_identity(NOW)?;
    let audience = cidfeed_credentials::IdentityKey::import(&[9; 32]);
    let grant = state.issue_delegation(audience.id(), [("feed", "publish")], Some(120), NOW)?;
    state.trust_issuer(identity.id())?;
    state.revoke_grant(&grant, "lost device", at(1))?;
    state.sign_ledger(identity.key())?;
    state.save(&store).await?;

    let mut loaded = SecurityState::load(&store, at(5)).await?;
    assert_eq!(loaded, state);
    assert_eq!(loaded.verify_grant(&grant, at(10))?, GrantStatus::Revoked);
    assert_eq!(loaded.evaluate_ledger(at(10))?, PolicyVerdict::Valid);

    loaded.clear_identity(at(20))?;
    loaded.save(&store).await?;
    assert_eq!(SecurityState::load(&store, at(30)).await?.identity(), None);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn corrupted_blobs_load_as_empty() -> TestResult {
    let store = MemoryStateStore::new();
    store.set(LEDGER_KEY, "{\"schemaVersion\":".into()).await?;
    store.set(OFFLINE_QUEUE_KEY, "[{\"revocationId\":\"\"}, 42]".into()).await?;
    store.set(AUDIT_LOG_KEY, "null".into()).await?;
    store.set(SETTINGS_KEY, "{\"replayBatchSize\":0}".into()).await?;

    let state = SecurityState::load(&store, NOW).await?;
    assert_eq!(state, SecurityState::new(Settings::default(), NOW));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn tampered_ledgers_are_reported() -> TestResult {
    let mut state = SecurityState::new(Settings::default(), NOW);
    let identity = state.create_identity(NOW)?;
    state.trust_issuer(identity.id())?;
    state.revoke("revoke-1", "spam", NOW)?;
    state.sign_ledger(identity.key())?;

    let store = MemoryStateStore::new();
    state.save(&store).await?;
    let json = store.get(LEDGER_KEY).await?.ok_or("ledger saved")?;
    store
        .set(LEDGER_KEY, json.replace("\"spam\"", "\"routine\""))
        .await?;

    let mut loaded = SecurityState::load(&store, NOW).await?;
    assert_eq!(loaded.evaluate_ledger(NOW)?, PolicyVerdict::InvalidSignature);

    loaded.distrust_issuer(identity.id());
    loaded.sign_ledger(identity.key())?;
    assert_eq!(loaded.evaluate_ledger(NOW)?, PolicyVerdict::UntrustedIssuer);
    Ok(())
}

#[test]
fn audit_log_is_capped_by_settings() -> TestResult {
    let settings = Settings {
        audit_max_entries: 3,
        ..Settings::default()
    };
    let mut state = SecurityState::new(settings, NOW);
    for offset in 0..5 {
        state.revoke(format!("revoke-{offset}"), "cleanup", at(offset))?;
    }
    assert_eq!(state.audit_log().len(), 3);
    assert_eq!(
        state.audit_log().latest().map(|entry| entry.detail()),
        Some("Revoked revoke-4: cleanup")
    );
    Ok(())
}
