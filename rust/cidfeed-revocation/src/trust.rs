use crate::RevocationError;
use cidfeed_common::{decode_list, encode};
use cidfeed_credentials::is_valid_identity_id;
use serde::{Deserialize, Deserializer, Serialize, de};
use std::collections::BTreeSet;

/// Identity ids the caller trusts to sign revocation ledgers.
///
/// Membership is owned entirely by the caller; nothing in the engine adds
/// or removes issuers on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrustedIssuerSet(BTreeSet<String>);

impl<'de> Deserialize<'de> for TrustedIssuerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ids = BTreeSet::<String>::deserialize(deserializer)?;
        if let Some(invalid) = ids.iter().find(|id| !is_valid_identity_id(id)) {
            return Err(de::Error::invalid_value(
                de::Unexpected::Str(invalid),
                &"a did:key identity id",
            ));
        }
        Ok(Self(ids))
    }
}

impl TrustedIssuerSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set with `issuer_id` added. Adding twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::InvalidIdentity`] if `issuer_id` is not a
    /// valid identity id.
    pub fn add(mut self, issuer_id: impl Into<String>) -> Result<Self, RevocationError> {
        let issuer_id = issuer_id.into();
        if !is_valid_identity_id(&issuer_id) {
            return Err(RevocationError::InvalidIdentity(issuer_id));
        }
        self.0.insert(issuer_id);
        Ok(self)
    }

    /// Returns the set without `issuer_id`.
    #[must_use]
    pub fn remove(mut self, issuer_id: &str) -> Self {
        self.0.remove(issuer_id);
        self
    }

    /// Membership test.
    #[must_use]
    pub fn contains(&self, issuer_id: &str) -> bool {
        self.0.contains(issuer_id)
    }

    /// Number of trusted issuers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no issuer is trusted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the trusted ids in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Encode as a sorted JSON array of ids.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, RevocationError> {
        Ok(encode("trusted issuers", self)?)
    }

    /// Decode from JSON, dropping anything that is not a valid identity id.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self(
            decode_list::<String>("trusted issuers", input)
                .into_iter()
                .filter(|id| is_valid_identity_id(id))
                .collect(),
        )
    }
}
