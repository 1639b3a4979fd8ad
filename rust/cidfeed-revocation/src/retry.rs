use crate::RevocationError;
use cidfeed_common::{Duration, Timestamp, decode_list, encode};
use cidfeed_delegation::RevocationId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How urgently an outstanding propagation failure needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrySeverity {
    /// Fewer than three failures.
    Low,
    /// Three or four failures.
    Medium,
    /// Five or more failures.
    High,
}

impl RetrySeverity {
    /// Classifies a failure count.
    #[must_use]
    pub const fn classify(retry_count: u32) -> Self {
        match retry_count {
            5.. => Self::High,
            3.. => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// An outstanding propagation failure for one revocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "FailedFlushRetryWire")]
pub struct FailedFlushRetry {
    revocation_id: RevocationId,
    failed_at: Timestamp,
    retry_count: u32,
    next_retry_at: Timestamp,
    last_error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FailedFlushRetryWire {
    revocation_id: RevocationId,
    failed_at: Timestamp,
    retry_count: u32,
    next_retry_at: Timestamp,
    last_error: String,
}

impl TryFrom<FailedFlushRetryWire> for FailedFlushRetry {
    type Error = RevocationError;

    fn try_from(wire: FailedFlushRetryWire) -> Result<Self, Self::Error> {
        if wire.revocation_id.is_blank() {
            return Err(RevocationError::EmptyIdentifier);
        }
        if wire.retry_count == 0 {
            return Err(RevocationError::ZeroRetryCount);
        }
        Ok(Self {
            revocation_id: wire.revocation_id,
            failed_at: wire.failed_at,
            retry_count: wire.retry_count,
            next_retry_at: wire.next_retry_at,
            last_error: wire.last_error,
        })
    }
}

impl FailedFlushRetry {
    /// Getter for the `revocation_id` field.
    #[must_use]
    pub const fn revocation_id(&self) -> &RevocationId {
        &self.revocation_id
    }

    /// Getter for the `failed_at` field.
    #[must_use]
    pub const fn failed_at(&self) -> Timestamp {
        self.failed_at
    }

    /// Getter for the `retry_count` field.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Getter for the `next_retry_at` field.
    #[must_use]
    pub const fn next_retry_at(&self) -> Timestamp {
        self.next_retry_at
    }

    /// Getter for the `last_error` field.
    #[must_use]
    pub fn last_error(&self) -> &str {
        &self.last_error
    }

    /// Derived from the failure count; never stored.
    #[must_use]
    pub const fn severity(&self) -> RetrySeverity {
        RetrySeverity::classify(self.retry_count)
    }

    /// `true` once `now` has reached the scheduled retry.
    #[must_use]
    pub fn is_ready(&self, now: Timestamp) -> bool {
        self.next_retry_at <= now
    }
}

/// Retry records split by whether they are due.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryPartition {
    /// Records whose `next_retry_at` is at or before the reference instant.
    pub ready: Vec<FailedFlushRetry>,
    /// Records still waiting.
    pub pending: Vec<FailedFlushRetry>,
}

impl RetryPartition {
    /// Revocation ids of the records that are due.
    pub fn ready_ids(&self) -> impl Iterator<Item = &RevocationId> {
        self.ready.iter().map(FailedFlushRetry::revocation_id)
    }
}

/// Outstanding propagation failures, one per revocation id, kept sorted by
/// the instant each becomes due.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FailedFlushRetries(Vec<FailedFlushRetry>);

impl FailedFlushRetries {
    /// No outstanding failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records in ascending `next_retry_at` order.
    #[must_use]
    pub fn entries(&self) -> &[FailedFlushRetry] {
        &self.0
    }

    /// Number of outstanding failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if nothing has failed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up the record for `revocation_id`.
    #[must_use]
    pub fn get(&self, revocation_id: &RevocationId) -> Option<&FailedFlushRetry> {
        self.0
            .iter()
            .find(|retry| &retry.revocation_id == revocation_id)
    }

    /// Records one failed flush attempt for each id in `failed`.
    ///
    /// The delay before the next attempt grows linearly with the failure
    /// count: `now + base_delay * retry_count`. An id listed more than once
    /// in a single call counts as one failure.
    #[must_use]
    pub fn record_failures<'a>(
        self,
        failed: impl IntoIterator<Item = &'a RevocationId>,
        now: Timestamp,
        error_label: &str,
        base_delay: Duration,
    ) -> Self {
        let mut by_id: HashMap<RevocationId, FailedFlushRetry> = self
            .0
            .into_iter()
            .map(|retry| (retry.revocation_id.clone(), retry))
            .collect();

        let mut seen = HashSet::new();
        for revocation_id in failed {
            if revocation_id.is_blank() || !seen.insert(revocation_id) {
                continue;
            }
            let retry_count = by_id
                .get(revocation_id)
                .map_or(1, |existing| existing.retry_count.saturating_add(1));
            let next_retry_at = now.saturating_add(base_delay.saturating_mul(retry_count.max(1)));

            tracing::debug!(
                %revocation_id,
                retry_count,
                %next_retry_at,
                error = error_label,
                "Recorded flush failure"
            );

            by_id.insert(
                revocation_id.clone(),
                FailedFlushRetry {
                    revocation_id: revocation_id.clone(),
                    failed_at: now,
                    retry_count,
                    next_retry_at,
                    last_error: error_label.to_owned(),
                },
            );
        }

        Self::sorted(by_id.into_values().collect())
    }

    /// Drops the records for revocations that have now propagated.
    #[must_use]
    pub fn clear_flushed<'a>(mut self, flushed: impl IntoIterator<Item = &'a RevocationId>) -> Self {
        let flushed: HashSet<&RevocationId> = flushed.into_iter().collect();
        self.0
            .retain(|retry| !flushed.contains(&retry.revocation_id));
        self
    }

    /// Splits the records into those due at `now` and those still waiting.
    #[must_use]
    pub fn partition_ready(&self, now: Timestamp) -> RetryPartition {
        let (ready, pending): (Vec<_>, Vec<_>) = self
            .0
            .iter()
            .cloned()
            .partition(|retry| retry.is_ready(now));
        RetryPartition { ready, pending }
    }

    /// Records at or above `severity`.
    pub fn at_least(&self, severity: RetrySeverity) -> impl Iterator<Item = &FailedFlushRetry> {
        self.0
            .iter()
            .filter(move |retry| retry.severity() >= severity)
    }

    /// Encode as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, RevocationError> {
        Ok(encode("flush retries", self)?)
    }

    /// Decode from JSON. Malformed records are dropped and, where an id
    /// repeats, the record with the higher failure count is kept.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self::from_records(decode_list::<FailedFlushRetry>("flush retries", input))
    }

    fn from_records(records: Vec<FailedFlushRetry>) -> Self {
        let mut by_id: HashMap<RevocationId, FailedFlushRetry> = HashMap::new();
        for record in records {
            match by_id.get(&record.revocation_id) {
                Some(existing) if existing.retry_count >= record.retry_count => {}
                _ => {
                    by_id.insert(record.revocation_id.clone(), record);
                }
            }
        }
        Self::sorted(by_id.into_values().collect())
    }

    fn sorted(mut records: Vec<FailedFlushRetry>) -> Self {
        records.sort_by(|a, b| {
            a.next_retry_at
                .cmp(&b.next_retry_at)
                .then_with(|| a.revocation_id.cmp(&b.revocation_id))
        });
        Self(records)
    }
}

impl<'de> Deserialize<'de> for FailedFlushRetries {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_records(Vec::<FailedFlushRetry>::deserialize(
            deserializer,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASE: Duration = Duration::from_secs(10);

    fn ids(ids: &[&str]) -> Vec<RevocationId> {
        ids.iter().copied().map(RevocationId::from).collect()
    }

    #[test]
    fn it_classifies_severity() {
        assert_eq!(RetrySeverity::classify(1), RetrySeverity::Low);
        assert_eq!(RetrySeverity::classify(2), RetrySeverity::Low);
        assert_eq!(RetrySeverity::classify(3), RetrySeverity::Medium);
        assert_eq!(RetrySeverity::classify(4), RetrySeverity::Medium);
        assert_eq!(RetrySeverity::classify(5), RetrySeverity::High);
        assert_eq!(RetrySeverity::classify(50), RetrySeverity::High);
    }

    #[test]
    fn duplicate_ids_in_one_call_count_once() {
        let retries = FailedFlushRetries::new().record_failures(
            &ids(&["a", "a", "a"]),
            Timestamp::from_millis(0),
            "timeout",
            BASE,
        );
        assert_eq!(retries.len(), 1);
        assert_eq!(retries.entries()[0].retry_count(), 1);
    }

    #[test]
    fn it_keeps_entries_sorted_by_due_time() {
        let retries = FailedFlushRetries::new()
            .record_failures(&ids(&["a"]), Timestamp::from_millis(0), "x", BASE)
            .record_failures(&ids(&["a"]), Timestamp::from_millis(0), "x", BASE)
            .record_failures(&ids(&["b"]), Timestamp::from_millis(5_000), "x", BASE);
        let order: Vec<&str> = retries
            .entries()
            .iter()
            .map(|r| r.revocation_id().as_str())
            .collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn readiness_is_inclusive() {
        let retries =
            FailedFlushRetries::new().record_failures(&ids(&["a"]), Timestamp::EPOCH, "x", BASE);
        assert!(
            retries
                .partition_ready(Timestamp::from_millis(9_999))
                .ready
                .is_empty()
        );
        let partition = retries.partition_ready(Timestamp::from_millis(10_000));
        assert_eq!(partition.ready_ids().collect::<Vec<_>>(), vec![&RevocationId::from("a")]);
        assert!(partition.pending.is_empty());
    }

    #[test]
    fn clear_flushed_only_touches_listed_ids() {
        let retries = FailedFlushRetries::new()
            .record_failures(&ids(&["a", "b"]), Timestamp::EPOCH, "x", BASE)
            .clear_flushed(&ids(&["b", "z"]));
        assert_eq!(retries.len(), 1);
        assert!(retries.get(&RevocationId::from("a")).is_some());
    }

    #[test]
    fn parse_drops_invalid_records() {
        let retries = FailedFlushRetries::parse(
            r#"[
                {"revocationId":"a","failedAt":1,"retryCount":0,"nextRetryAt":2,"lastError":"x"},
                {"revocationId":"","failedAt":1,"retryCount":1,"nextRetryAt":2,"lastError":"x"},
                {"revocationId":"b","failedAt":1,"retryCount":2,"nextRetryAt":2,"lastError":"x"},
                {"revocationId":"b","failedAt":1,"retryCount":1,"nextRetryAt":9,"lastError":"y"},
                {"revocationId":"c"}
            ]"#,
        );
        assert_eq!(retries.len(), 1);
        assert_eq!(retries.entries()[0].retry_count(), 2);
        assert_eq!(retries.entries()[0].last_error(), "x");
    }
}
