use crate::{RevocationFlush, SecurityState, SessionError, state::audit_entry};
use cidfeed_audit::AuditEvent;
use cidfeed_common::Timestamp;
use cidfeed_delegation::RevocationId;
use cidfeed_revocation::{FlushOutcome, OfflineRevocationQueue};

/// Label recorded for ids the transport neither confirmed nor failed.
pub const UNCONFIRMED_FLUSH_LABEL: &str = "unconfirmed";

/// What one replay pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Ids handed to the transport.
    pub attempted: Vec<RevocationId>,
    /// Ids confirmed and removed from the queue.
    pub flushed: Vec<RevocationId>,
    /// Ids that stay queued with a retry scheduled.
    pub failed: Vec<RevocationId>,
}

impl ReplayReport {
    /// `true` if nothing was due for replay.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.attempted.is_empty()
    }
}

impl SecurityState {
    /// Offers due offline revocations to `flush` and folds the reply back in.
    ///
    /// An entry is due unless it has a retry scheduled after `now`. At most
    /// [`crate::Settings::replay_batch_size`] entries are offered, oldest
    /// first. Confirmed ids leave the queue and lose their retry record.
    /// Failed ids, and ids the transport did not mention, stay queued and
    /// get a retry scheduled with linear backoff. A transport error fails
    /// the whole batch.
    ///
    /// # Errors
    ///
    /// Fails only if the audit entry cannot be minted, in which case the
    /// state is left as it was.
    pub async fn replay_offline<F>(
        &mut self,
        flush: &F,
        now: Timestamp,
    ) -> Result<ReplayReport, SessionError>
    where
        F: RevocationFlush + ?Sized,
    {
        let due: OfflineRevocationQueue = self
            .offline_queue
            .entries()
            .iter()
            .filter(|entry| {
                self.flush_retries
                    .get(entry.revocation_id())
                    .is_none_or(|retry| retry.is_ready(now))
            })
            .cloned()
            .collect();
        let batch = due.replay_batch(self.settings.replay_batch_size).replayed;
        if batch.is_empty() {
            return Ok(ReplayReport::default());
        }
        let attempted: Vec<RevocationId> = batch
            .iter()
            .map(|entry| entry.revocation_id().clone())
            .collect();

        let (outcome, error_label) = match flush.flush(&batch).await {
            Ok(outcome) => (outcome.normalized(), None),
            Err(error) => {
                tracing::warn!(%error, batch = batch.len(), "Revocation flush failed");
                (
                    FlushOutcome::all_failed(attempted.iter().cloned()),
                    Some(error.to_string()),
                )
            }
        };
        let flushed: Vec<RevocationId> = outcome
            .flushed_ids
            .iter()
            .filter(|id| attempted.contains(id))
            .cloned()
            .collect();
        let failed: Vec<RevocationId> = outcome
            .failed_ids
            .iter()
            .filter(|id| attempted.contains(id))
            .cloned()
            .collect();
        let unconfirmed = outcome.unaccounted(&batch);

        let entry = audit_entry(
            AuditEvent::RevocationReplayed,
            format!(
                "Replayed {} revocations: {} flushed, {} failed",
                attempted.len(),
                flushed.len(),
                failed.len() + unconfirmed.len()
            ),
            now,
        )?;

        let base_delay = self.settings.retry_base_delay();
        let error_label = error_label.unwrap_or_else(|| String::from("flush failed"));
        self.offline_queue = std::mem::take(&mut self.offline_queue).acknowledge(&flushed);
        self.flush_retries = std::mem::take(&mut self.flush_retries)
            .clear_flushed(&flushed)
            .record_failures(&failed, now, &error_label, base_delay)
            .record_failures(&unconfirmed, now, UNCONFIRMED_FLUSH_LABEL, base_delay);
        self.append_audit(entry);

        tracing::debug!(
            attempted = attempted.len(),
            flushed = flushed.len(),
            failed = failed.len(),
            unconfirmed = unconfirmed.len(),
            "Replayed offline revocations"
        );

        let mut failed = failed;
        failed.extend(unconfirmed);
        Ok(ReplayReport {
            attempted,
            flushed,
            failed,
        })
    }
}
