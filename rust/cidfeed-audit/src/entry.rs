use crate::{AuditError, AuditEvent};
use cidfeed_common::Timestamp;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SecurityAuditEntryWire")]
pub struct SecurityAuditEntry {
    id: Ulid,
    event: AuditEvent,
    detail: String,
    timestamp: Timestamp,
}

#[derive(Deserialize)]
struct SecurityAuditEntryWire {
    id: Ulid,
    event: AuditEvent,
    detail: String,
    timestamp: Timestamp,
}

impl TryFrom<SecurityAuditEntryWire> for SecurityAuditEntry {
    type Error = AuditError;

    fn try_from(wire: SecurityAuditEntryWire) -> Result<Self, Self::Error> {
        if wire.detail.trim().is_empty() {
            return Err(AuditError::EmptyDetail);
        }
        Ok(Self {
            id: wire.id,
            event: wire.event,
            detail: wire.detail,
            timestamp: wire.timestamp,
        })
    }
}

impl SecurityAuditEntry {
    /// Creates an entry with a fresh id whose time component is `timestamp`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::EmptyDetail`] for a blank detail, or
    /// [`AuditError::Rng`] if no randomness is available for the id.
    pub fn new(
        event: AuditEvent,
        detail: impl Into<String>,
        timestamp: Timestamp,
    ) -> Result<Self, AuditError> {
        let detail = detail.into();
        if detail.trim().is_empty() {
            return Err(AuditError::EmptyDetail);
        }
        let mut random = [0u8; 16];
        getrandom::getrandom(&mut random)?;
        Ok(Self {
            id: Ulid::from_parts(timestamp.as_millis(), u128::from_be_bytes(random)),
            event,
            detail,
            timestamp,
        })
    }

    /// Getter for the `id` field.
    #[must_use]
    pub const fn id(&self) -> Ulid {
        self.id
    }

    /// Getter for the `event` field.
    #[must_use]
    pub const fn event(&self) -> AuditEvent {
        self.event
    }

    /// Getter for the `detail` field.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Getter for the `timestamp` field.
    #[must_use]
    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
