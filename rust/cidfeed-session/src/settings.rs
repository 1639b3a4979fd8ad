use cidfeed_common::Duration;
use cidfeed_delegation::{DEFAULT_TTL_SECONDS, MAX_TTL_SECONDS, MIN_TTL_SECONDS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections from [`Settings`] validation.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The document is not valid settings JSON.
    #[error("Malformed settings: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The default delegation lifetime is outside the issuable window.
    #[error("Default TTL of {0}s is outside [60, 31536000]")]
    DefaultTtlOutOfRange(u64),

    /// A setting that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Tunables for a [`crate::SecurityState`].
///
/// Missing fields take their defaults when loaded from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SettingsWire")]
pub struct Settings {
    /// Lifetime of delegations issued without an explicit TTL.
    pub default_ttl_seconds: u64,
    /// How many audit entries are retained.
    pub audit_max_entries: usize,
    /// Delay unit for linear flush retry backoff.
    pub retry_base_delay_ms: u64,
    /// Maximum entries handed to the flush transport per replay.
    pub replay_batch_size: usize,
    /// Grants with less than this much life left count as expiring soon.
    pub expiring_soon_threshold_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            audit_max_entries: 200,
            retry_base_delay_ms: 30_000,
            replay_batch_size: 20,
            expiring_soon_threshold_ms: 300_000,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsWire {
    default_ttl_seconds: u64,
    audit_max_entries: usize,
    retry_base_delay_ms: u64,
    replay_batch_size: usize,
    expiring_soon_threshold_ms: u64,
}

impl Default for SettingsWire {
    fn default() -> Self {
        let defaults = Settings::default();
        Self {
            default_ttl_seconds: defaults.default_ttl_seconds,
            audit_max_entries: defaults.audit_max_entries,
            retry_base_delay_ms: defaults.retry_base_delay_ms,
            replay_batch_size: defaults.replay_batch_size,
            expiring_soon_threshold_ms: defaults.expiring_soon_threshold_ms,
        }
    }
}

impl TryFrom<SettingsWire> for Settings {
    type Error = SettingsError;

    fn try_from(wire: SettingsWire) -> Result<Self, Self::Error> {
        Settings {
            default_ttl_seconds: wire.default_ttl_seconds,
            audit_max_entries: wire.audit_max_entries,
            retry_base_delay_ms: wire.retry_base_delay_ms,
            replay_batch_size: wire.replay_batch_size,
            expiring_soon_threshold_ms: wire.expiring_soon_threshold_ms,
        }
        .validated()
    }
}

impl Settings {
    /// Checks every field.
    ///
    /// # Errors
    ///
    /// Returns the first [`SettingsError`] found.
    pub fn validated(self) -> Result<Self, SettingsError> {
        if !(MIN_TTL_SECONDS..=MAX_TTL_SECONDS).contains(&self.default_ttl_seconds) {
            return Err(SettingsError::DefaultTtlOutOfRange(
                self.default_ttl_seconds,
            ));
        }
        if self.audit_max_entries == 0 {
            return Err(SettingsError::Zero("auditMaxEntries"));
        }
        if self.retry_base_delay_ms == 0 {
            return Err(SettingsError::Zero("retryBaseDelayMs"));
        }
        if self.replay_batch_size == 0 {
            return Err(SettingsError::Zero("replayBatchSize"));
        }
        Ok(self)
    }

    /// Loads settings from JSON, filling in defaults for absent fields.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] for malformed JSON or out-of-range values.
    pub fn from_json(input: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(input)?)
    }

    /// [`Settings::retry_base_delay_ms`] as a [`Duration`].
    #[must_use]
    pub const fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    /// [`Settings::expiring_soon_threshold_ms`] as a [`Duration`].
    #[must_use]
    pub const fn expiring_soon_threshold(&self) -> Duration {
        Duration::from_millis(self.expiring_soon_threshold_ms)
    }
}
