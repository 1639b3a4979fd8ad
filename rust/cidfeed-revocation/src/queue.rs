use crate::RevocationError;
use cidfeed_common::{Timestamp, decode_list, encode};
use cidfeed_delegation::RevocationId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A revocation staged locally until its propagation is confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "OfflineRevocationEntryWire")]
pub struct OfflineRevocationEntry {
    revocation_id: RevocationId,
    queued_at: Timestamp,
    reason: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfflineRevocationEntryWire {
    revocation_id: RevocationId,
    queued_at: Timestamp,
    reason: String,
}

impl TryFrom<OfflineRevocationEntryWire> for OfflineRevocationEntry {
    type Error = RevocationError;

    fn try_from(wire: OfflineRevocationEntryWire) -> Result<Self, Self::Error> {
        OfflineRevocationEntry::new(wire.revocation_id, &wire.reason, wire.queued_at)
    }
}

impl OfflineRevocationEntry {
    /// Creates a queue entry.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::EmptyIdentifier`] or
    /// [`RevocationError::EmptyReason`] for blank inputs.
    pub fn new(
        revocation_id: impl Into<RevocationId>,
        reason: &str,
        queued_at: Timestamp,
    ) -> Result<Self, RevocationError> {
        let revocation_id = revocation_id.into();
        if revocation_id.is_blank() {
            return Err(RevocationError::EmptyIdentifier);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(RevocationError::EmptyReason);
        }
        Ok(Self {
            revocation_id,
            queued_at,
            reason: reason.to_owned(),
        })
    }

    /// Getter for the `revocation_id` field.
    #[must_use]
    pub const fn revocation_id(&self) -> &RevocationId {
        &self.revocation_id
    }

    /// Getter for the `queued_at` field.
    #[must_use]
    pub const fn queued_at(&self) -> Timestamp {
        self.queued_at
    }

    /// Getter for the `reason` field.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A batch split off the queue for replay, plus what is left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayBatch {
    /// Entries to hand to the flush transport, in insertion order.
    pub replayed: Vec<OfflineRevocationEntry>,
    /// Entries not included in this batch.
    pub remaining: Vec<OfflineRevocationEntry>,
}

/// Insertion-ordered set of pending revocations, keyed by revocation id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OfflineRevocationQueue(Vec<OfflineRevocationEntry>);

impl OfflineRevocationQueue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[OfflineRevocationEntry] {
        &self.0
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, revocation_id: &RevocationId) -> bool {
        self.0
            .iter()
            .any(|entry| &entry.revocation_id == revocation_id)
    }

    /// Adds `entry` unless its revocation id is already queued, in which case
    /// the first queued entry wins and the queue is returned unchanged.
    #[must_use]
    pub fn enqueue(mut self, entry: OfflineRevocationEntry) -> Self {
        if !self.contains(&entry.revocation_id) {
            self.0.push(entry);
        }
        self
    }

    /// Splits off the first `max_batch` entries for replay.
    ///
    /// This does not assume the replay will succeed. The authoritative queue
    /// only shrinks through [`OfflineRevocationQueue::acknowledge`] once the
    /// caller has confirmation, which gives at-least-once propagation.
    #[must_use]
    pub fn replay_batch(&self, max_batch: usize) -> ReplayBatch {
        let split = max_batch.min(self.0.len());
        ReplayBatch {
            replayed: self.0[..split].to_vec(),
            remaining: self.0[split..].to_vec(),
        }
    }

    /// Removes entries whose propagation has been confirmed.
    #[must_use]
    pub fn acknowledge<'a>(mut self, flushed: impl IntoIterator<Item = &'a RevocationId>) -> Self {
        let flushed: HashSet<&RevocationId> = flushed.into_iter().collect();
        self.0
            .retain(|entry| !flushed.contains(&entry.revocation_id));
        self
    }

    /// Encode as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, RevocationError> {
        Ok(encode("offline revocation queue", self)?)
    }

    /// Decode from JSON. Malformed or blank entries are dropped and repeated
    /// revocation ids keep their first occurrence.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        decode_list::<OfflineRevocationEntry>("offline revocation queue", input)
            .into_iter()
            .collect()
    }
}

impl FromIterator<OfflineRevocationEntry> for OfflineRevocationQueue {
    fn from_iter<I: IntoIterator<Item = OfflineRevocationEntry>>(entries: I) -> Self {
        entries.into_iter().fold(Self::new(), Self::enqueue)
    }
}

impl<'de> Deserialize<'de> for OfflineRevocationQueue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<OfflineRevocationEntry>::deserialize(deserializer)?
            .into_iter()
            .collect())
    }
}
