use crate::{AuditError, AuditEvent, SecurityAuditEntry};
use cidfeed_common::{decode_list, encode};
use serde::{Deserialize, Serialize};

/// Bounded audit trail, most recent entry first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecurityAuditLog(Vec<SecurityAuditEntry>);

impl SecurityAuditLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries, most recent first.
    #[must_use]
    pub fn entries(&self) -> &[SecurityAuditEntry] {
        &self.0
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<&SecurityAuditEntry> {
        self.0.first()
    }

    /// Entries of one kind, most recent first.
    pub fn of_kind(&self, event: AuditEvent) -> impl Iterator<Item = &SecurityAuditEntry> {
        self.0.iter().filter(move |entry| entry.event() == event)
    }

    /// Puts `entry` at the front and keeps at most `max_entries`, dropping the
    /// oldest overflow.
    #[must_use]
    pub fn append(mut self, entry: SecurityAuditEntry, max_entries: usize) -> Self {
        tracing::debug!(event = %entry.event(), detail = entry.detail(), "Audit");
        self.0.insert(0, entry);
        self.0.truncate(max_entries);
        self
    }

    /// Drops all but the `max_entries` most recent entries.
    #[must_use]
    pub fn truncated(mut self, max_entries: usize) -> Self {
        self.0.truncate(max_entries);
        self
    }

    /// Encode as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, AuditError> {
        Ok(encode("audit log", self)?)
    }

    /// Decode from JSON, dropping unknown events and malformed entries.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self(decode_list("audit log", input))
    }
}
