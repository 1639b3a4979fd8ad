//! Identity handles.

use crate::{did::is_valid_identity_id, error::IdentityError, key::IdentityKey};
use cidfeed_common::{Timestamp, decode, encode};
use serde::{Deserialize, Serialize};

/// The public face of an identity: its `did:key` id and when it was created.
///
/// Handles are immutable. An identity is never destroyed, only superseded
/// by creating a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "IdentityHandleWire")]
pub struct IdentityHandle {
    id: String,
    created_at: Timestamp,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityHandleWire {
    id: String,
    created_at: Timestamp,
}

impl TryFrom<IdentityHandleWire> for IdentityHandle {
    type Error = &'static str;

    fn try_from(wire: IdentityHandleWire) -> Result<Self, Self::Error> {
        if !is_valid_identity_id(&wire.id) {
            return Err("identity id is not a valid did:key");
        }
        Ok(Self {
            id: wire.id,
            created_at: wire.created_at,
        })
    }
}

impl IdentityHandle {
    /// Getter for the `id` field.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Getter for the `created_at` field.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, IdentityError> {
        Ok(encode("identity handle", self)?)
    }

    /// Decode from JSON, yielding `None` for anything malformed.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        decode("identity handle", input)
    }
}

/// A freshly created identity: the shareable handle plus the keypair that
/// backs it.
#[derive(Debug, Clone)]
pub struct Identity {
    handle: IdentityHandle,
    key: IdentityKey,
}

impl Identity {
    /// Generate a new identity stamped with `now`.
    ///
    /// # Errors
    ///
    /// Fails only if the platform entropy source is unavailable.
    pub fn create(now: Timestamp) -> Result<Self, IdentityError> {
        let key = IdentityKey::generate()?;
        tracing::debug!(id = key.id(), "Created identity");
        Ok(Self::from_key(key, now))
    }

    /// Wrap an existing keypair, e.g. one restored from an exported seed.
    #[must_use]
    pub fn from_key(key: IdentityKey, created_at: Timestamp) -> Self {
        let handle = IdentityHandle {
            id: key.id().to_owned(),
            created_at,
        };
        Self { handle, key }
    }

    /// The public handle.
    #[must_use]
    pub const fn handle(&self) -> &IdentityHandle {
        &self.handle
    }

    /// The backing keypair.
    #[must_use]
    pub const fn key(&self) -> &IdentityKey {
        &self.key
    }

    /// Shorthand for `self.handle().id()`.
    #[must_use]
    pub fn id(&self) -> &str {
        self.handle.id()
    }
}

/// Generate a new identity stamped with `now`.
///
/// # Errors
///
/// Fails only if the platform entropy source is unavailable.
pub fn create_identity(now: Timestamp) -> Result<Identity, IdentityError> {
    Identity::create(now)
}
