use crate::OfflineRevocationEntry;
use cidfeed_delegation::RevocationId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What the external transport reported for one flush attempt.
///
/// A partial failure is data, not an error. The two lists are expected to be
/// disjoint and need not cover every id that was handed to the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushOutcome {
    /// Ids whose propagation was confirmed.
    #[serde(default)]
    pub flushed_ids: Vec<RevocationId>,
    /// Ids the transport reports as failed.
    #[serde(default)]
    pub failed_ids: Vec<RevocationId>,
}

impl FlushOutcome {
    /// Every id confirmed.
    #[must_use]
    pub fn all_flushed(ids: impl IntoIterator<Item = RevocationId>) -> Self {
        Self {
            flushed_ids: ids.into_iter().collect(),
            failed_ids: Vec::new(),
        }
    }

    /// Every id failed.
    #[must_use]
    pub fn all_failed(ids: impl IntoIterator<Item = RevocationId>) -> Self {
        Self {
            flushed_ids: Vec::new(),
            failed_ids: ids.into_iter().collect(),
        }
    }

    /// Resolves an id reported on both sides as failed, so it stays queued,
    /// and removes blanks and repeats.
    #[must_use]
    pub fn normalized(self) -> Self {
        let failed = dedup(self.failed_ids);
        let failed_set: HashSet<&RevocationId> = failed.iter().collect();
        let flushed = dedup(self.flushed_ids)
            .into_iter()
            .filter(|id| !failed_set.contains(id))
            .collect();
        Self {
            flushed_ids: flushed,
            failed_ids: failed,
        }
    }

    /// Ids from `batch` the transport said nothing about. They remain queued
    /// and are offered again on the next replay.
    #[must_use]
    pub fn unaccounted(&self, batch: &[OfflineRevocationEntry]) -> Vec<RevocationId> {
        let reported: HashSet<&RevocationId> =
            self.flushed_ids.iter().chain(&self.failed_ids).collect();
        batch
            .iter()
            .map(OfflineRevocationEntry::revocation_id)
            .filter(|id| !reported.contains(id))
            .cloned()
            .collect()
    }
}

fn dedup(ids: Vec<RevocationId>) -> Vec<RevocationId> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| !id.is_blank() && seen.insert(id.clone()))
        .collect()
}
