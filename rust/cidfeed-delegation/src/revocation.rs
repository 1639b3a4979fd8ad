use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Opaque token bound one-to-one to a delegation grant.
///
/// Revoking a grant means publishing its revocation id; the grant itself is
/// never edited.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevocationId(String);

impl RevocationId {
    /// Wraps a raw identifier without validation.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for RevocationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RevocationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for RevocationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything that can answer whether a revocation id has been revoked.
///
/// The revocation ledger is the production implementor; plain sets are
/// handy in tests.
pub trait RevocationCheck {
    /// Returns `true` if `revocation_id` has been revoked.
    fn is_revoked(&self, revocation_id: &RevocationId) -> bool;
}

impl<H: std::hash::BuildHasher> RevocationCheck for HashSet<RevocationId, H> {
    fn is_revoked(&self, revocation_id: &RevocationId) -> bool {
        self.contains(revocation_id)
    }
}

impl RevocationCheck for BTreeSet<RevocationId> {
    fn is_revoked(&self, revocation_id: &RevocationId) -> bool {
        self.contains(revocation_id)
    }
}

impl<T: RevocationCheck + ?Sized> RevocationCheck for &T {
    fn is_revoked(&self, revocation_id: &RevocationId) -> bool {
        (**self).is_revoked(revocation_id)
    }
}
