use crate::{RevocationError, TrustedIssuerSet};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use cidfeed_common::{Timestamp, decode, encode};
use cidfeed_credentials::{IdentityKey, is_valid_identity_id, verify_signature};
use cidfeed_delegation::{RevocationCheck, RevocationId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Schema version written into every ledger this crate produces.
pub const LEDGER_SCHEMA_VERSION: u32 = 1;

/// One revoked grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationLedgerEntry {
    revocation_id: RevocationId,
    revoked_at: Timestamp,
    reason: String,
}

impl RevocationLedgerEntry {
    /// Getter for the `revocation_id` field.
    #[must_use]
    pub const fn revocation_id(&self) -> &RevocationId {
        &self.revocation_id
    }

    /// Getter for the `revoked_at` field.
    #[must_use]
    pub const fn revoked_at(&self) -> Timestamp {
        self.revoked_at
    }

    /// Getter for the `reason` field.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Result of judging a ledger against a [`TrustedIssuerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyVerdict {
    /// Correctly signed by a trusted issuer (or empty and unsigned).
    Valid,
    /// Correctly signed, but not by a trusted issuer.
    UntrustedIssuer,
    /// The signature is missing or does not match the content.
    InvalidSignature,
}

impl PolicyVerdict {
    /// The kebab-case wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PolicyVerdict::Valid => "valid",
            PolicyVerdict::UntrustedIssuer => "untrusted-issuer",
            PolicyVerdict::InvalidSignature => "invalid-signature",
        }
    }
}

impl std::fmt::Display for PolicyVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append/upsert list of revoked grants, signed by its issuer.
///
/// A signature covers exactly the schema version, `updated_at`, issuer and
/// entry set it was computed over. Every content change clears it, so a
/// ledger must be re-signed after each [`RevocationLedger::record_revocation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RevocationLedgerWire")]
pub struct RevocationLedger {
    schema_version: u32,
    updated_at: Timestamp,
    issuer_id: Option<String>,
    signature: Option<String>,
    entries: Vec<RevocationLedgerEntry>,
}

/// The exact content a ledger signature commits to.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SigningPayload<'a> {
    schema_version: u32,
    updated_at: Timestamp,
    issuer_id: &'a str,
    entries: &'a [RevocationLedgerEntry],
}

impl RevocationLedger {
    /// A ledger with no issuer, no signature and no entries.
    #[must_use]
    pub const fn empty(now: Timestamp) -> Self {
        Self {
            schema_version: LEDGER_SCHEMA_VERSION,
            updated_at: now,
            issuer_id: None,
            signature: None,
            entries: Vec::new(),
        }
    }

    /// Getter for the `schema_version` field.
    #[must_use]
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Getter for the `updated_at` field.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Getter for the `issuer_id` field.
    #[must_use]
    pub fn issuer_id(&self) -> Option<&str> {
        self.issuer_id.as_deref()
    }

    /// Getter for the `signature` field.
    #[must_use]
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Entries, most recently revoked first.
    #[must_use]
    pub fn entries(&self) -> &[RevocationLedgerEntry] {
        &self.entries
    }

    /// Number of revoked grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing has been revoked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the entry for `revocation_id`.
    #[must_use]
    pub fn entry(&self, revocation_id: &RevocationId) -> Option<&RevocationLedgerEntry> {
        self.entries
            .iter()
            .find(|entry| &entry.revocation_id == revocation_id)
    }

    /// Membership test.
    #[must_use]
    pub fn is_revoked(&self, revocation_id: &RevocationId) -> bool {
        self.entry(revocation_id).is_some()
    }

    /// Records (or replaces) the revocation of `revocation_id`.
    ///
    /// Any existing entry with the same id is replaced rather than
    /// duplicated, entries are re-sorted by `revoked_at` descending, and the
    /// signature is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::EmptyIdentifier`] or
    /// [`RevocationError::EmptyReason`] for blank inputs.
    pub fn record_revocation(
        mut self,
        revocation_id: impl Into<RevocationId>,
        reason: &str,
        revoked_at: Timestamp,
    ) -> Result<Self, RevocationError> {
        let revocation_id = revocation_id.into();
        if revocation_id.is_blank() {
            return Err(RevocationError::EmptyIdentifier);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(RevocationError::EmptyReason);
        }

        tracing::debug!(%revocation_id, %revoked_at, "Recording revocation");

        self.entries
            .retain(|entry| entry.revocation_id != revocation_id);
        self.entries.push(RevocationLedgerEntry {
            revocation_id,
            revoked_at,
            reason: reason.to_owned(),
        });
        sort_entries(&mut self.entries);
        self.updated_at = self.updated_at.max(revoked_at);
        self.signature = None;
        Ok(self)
    }

    /// Signs the current content with `issuer`'s key.
    ///
    /// # Errors
    ///
    /// Returns [`RevocationError::InvalidIdentity`] if the key's id is not a
    /// valid identity id, or [`RevocationError::Canonicalize`] if the content
    /// cannot be encoded.
    pub fn sign(mut self, issuer: &IdentityKey) -> Result<Self, RevocationError> {
        if !is_valid_identity_id(issuer.id()) {
            return Err(RevocationError::InvalidIdentity(issuer.id().to_owned()));
        }
        let payload = self.signing_payload(issuer.id())?;
        let signature = issuer.sign(&payload);

        tracing::debug!(issuer = issuer.id(), entries = self.entries.len(), "Signed ledger");

        self.issuer_id = Some(issuer.id().to_owned());
        self.signature = Some(URL_SAFE_NO_PAD.encode(signature));
        Ok(self)
    }

    /// Checks the signature against the current content.
    ///
    /// An empty ledger is trivially valid. Otherwise the issuer must be
    /// present and structurally valid, and the signature must verify against
    /// the issuer's key over the current entries.
    #[must_use]
    pub fn verify_signature(&self) -> bool {
        if self.entries.is_empty() {
            return true;
        }
        let (Some(issuer_id), Some(signature)) = (&self.issuer_id, &self.signature) else {
            return false;
        };
        if !is_valid_identity_id(issuer_id) {
            return false;
        }
        let Ok(signature) = URL_SAFE_NO_PAD.decode(signature) else {
            return false;
        };
        let Ok(payload) = self.signing_payload(issuer_id) else {
            return false;
        };
        verify_signature(issuer_id, &payload, &signature)
    }

    /// Judges whether this ledger may be relied upon.
    ///
    /// The signature is checked first: a bad signature is reported as
    /// [`PolicyVerdict::InvalidSignature`] even if the claimed issuer is
    /// trusted. Only a correctly signed ledger is checked for issuer trust.
    /// An empty ledger without an issuer revokes nothing and is valid.
    #[must_use]
    pub fn evaluate_policy(&self, trusted_issuers: &TrustedIssuerSet) -> PolicyVerdict {
        if !self.verify_signature() {
            return PolicyVerdict::InvalidSignature;
        }
        match &self.issuer_id {
            None if self.entries.is_empty() => PolicyVerdict::Valid,
            Some(issuer_id) if trusted_issuers.contains(issuer_id) => PolicyVerdict::Valid,
            _ => PolicyVerdict::UntrustedIssuer,
        }
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON encoding fails.
    pub fn to_json(&self) -> Result<String, RevocationError> {
        Ok(encode("revocation ledger", self)?)
    }

    /// Decode from JSON, yielding `None` for anything malformed.
    ///
    /// A well-formed ledger with a bad issuer or signature still decodes;
    /// judging it is the job of [`RevocationLedger::evaluate_policy`].
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        decode("revocation ledger", input)
    }

    fn signing_payload(&self, issuer_id: &str) -> Result<Vec<u8>, RevocationError> {
        serde_ipld_dagcbor::to_vec(&SigningPayload {
            schema_version: self.schema_version,
            updated_at: self.updated_at,
            issuer_id,
            entries: &self.entries,
        })
        .map_err(|error| RevocationError::Canonicalize(error.to_string()))
    }
}

impl RevocationCheck for RevocationLedger {
    fn is_revoked(&self, revocation_id: &RevocationId) -> bool {
        RevocationLedger::is_revoked(self, revocation_id)
    }
}

fn sort_entries(entries: &mut [RevocationLedgerEntry]) {
    entries.sort_by(|a, b| {
        b.revoked_at
            .cmp(&a.revoked_at)
            .then_with(|| a.revocation_id.cmp(&b.revocation_id))
    });
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RevocationLedgerWire {
    schema_version: u32,
    updated_at: Timestamp,
    issuer_id: Option<String>,
    signature: Option<String>,
    entries: Vec<RevocationLedgerEntry>,
}

impl TryFrom<RevocationLedgerWire> for RevocationLedger {
    type Error = &'static str;

    fn try_from(wire: RevocationLedgerWire) -> Result<Self, Self::Error> {
        if wire.schema_version != LEDGER_SCHEMA_VERSION {
            return Err("unrecognized schema version");
        }
        let mut seen = HashSet::new();
        for entry in &wire.entries {
            if entry.revocation_id.is_blank() || entry.reason.trim().is_empty() {
                return Err("blank revocation id or reason");
            }
            if !seen.insert(&entry.revocation_id) {
                return Err("duplicate revocation id");
            }
        }
        let mut entries = wire.entries;
        sort_entries(&mut entries);
        Ok(Self {
            schema_version: wire.schema_version,
            updated_at: wire.updated_at,
            issuer_id: wire.issuer_id,
            signature: wire.signature,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn issuer() -> IdentityKey {
        IdentityKey::import(&[21; 32])
    }

    fn ledger() -> RevocationLedger {
        RevocationLedger::empty(Timestamp::from_millis(1_000))
            .record_revocation("revoke-1", "key compromise", Timestamp::from_millis(5_000))
            .unwrap()
    }

    #[test]
    fn it_upserts_by_revocation_id() {
        let ledger = ledger()
            .record_revocation("revoke-1", "superseded", Timestamp::from_millis(6_000))
            .unwrap();
        assert_eq!(ledger.len(), 1);
        let entry = ledger.entry(&"revoke-1".into()).unwrap();
        assert_eq!(entry.reason(), "superseded");
        assert_eq!(entry.revoked_at(), Timestamp::from_millis(6_000));
    }

    #[test]
    fn it_keeps_entries_newest_first() {
        let ledger = ledger()
            .record_revocation("revoke-0", "old", Timestamp::from_millis(100))
            .unwrap()
            .record_revocation("revoke-2", "new", Timestamp::from_millis(9_000))
            .unwrap();
        let ids: Vec<&str> = ledger
            .entries()
            .iter()
            .map(|e| e.revocation_id().as_str())
            .collect();
        assert_eq!(ids, vec!["revoke-2", "revoke-1", "revoke-0"]);
    }

    #[test]
    fn it_only_moves_updated_at_forward() {
        let ledger = ledger();
        assert_eq!(ledger.updated_at(), Timestamp::from_millis(5_000));
        let ledger = ledger
            .record_revocation("revoke-0", "old", Timestamp::from_millis(100))
            .unwrap();
        assert_eq!(ledger.updated_at(), Timestamp::from_millis(5_000));
    }

    #[test]
    fn it_rejects_blank_inputs() {
        let empty = RevocationLedger::empty(Timestamp::EPOCH);
        assert!(matches!(
            empty.clone().record_revocation(" ", "reason", Timestamp::EPOCH),
            Err(RevocationError::EmptyIdentifier)
        ));
        assert!(matches!(
            empty.record_revocation("revoke-1", "\n", Timestamp::EPOCH),
            Err(RevocationError::EmptyReason)
        ));
    }

    #[test]
    fn it_treats_an_empty_ledger_as_trivially_valid() {
        let empty = RevocationLedger::empty(Timestamp::EPOCH);
        assert!(empty.verify_signature());
        assert_eq!(
            empty.evaluate_policy(&TrustedIssuerSet::new()),
            PolicyVerdict::Valid
        );
    }

    #[test]
    fn it_rejects_unsigned_content() {
        let unsigned = ledger();
        assert!(!unsigned.verify_signature());
        assert_eq!(
            unsigned.evaluate_policy(&TrustedIssuerSet::new()),
            PolicyVerdict::InvalidSignature
        );
    }

    #[test]
    fn it_rejects_a_swapped_issuer() {
        let mut signed = ledger().sign(&issuer()).unwrap();
        signed.issuer_id = Some(IdentityKey::import(&[22; 32]).id().to_owned());
        assert!(!signed.verify_signature());
    }

    #[test]
    fn it_rejects_garbled_signatures() {
        let mut signed = ledger().sign(&issuer()).unwrap();
        signed.signature = Some("!!not base64!!".into());
        assert!(!signed.verify_signature());

        let mut signed = ledger().sign(&issuer()).unwrap();
        signed.signature = Some(URL_SAFE_NO_PAD.encode([0u8; 64]));
        assert!(!signed.verify_signature());
    }

    #[test]
    fn it_rejects_a_moved_updated_at() {
        let mut signed = ledger().sign(&issuer()).unwrap();
        signed.updated_at = Timestamp::from_millis(99_999);
        assert!(!signed.verify_signature());
    }

    #[test]
    fn parse_sorts_entries_and_rejects_duplicates() {
        let sorted = RevocationLedger::parse(
            r#"{"schemaVersion":1,"updatedAt":3,"issuerId":null,"signature":null,"entries":[
                {"revocationId":"a","revokedAt":1,"reason":"x"},
                {"revocationId":"b","revokedAt":2,"reason":"y"}]}"#,
        )
        .unwrap();
        assert_eq!(sorted.entries()[0].revocation_id().as_str(), "b");

        let duplicated = RevocationLedger::parse(
            r#"{"schemaVersion":1,"updatedAt":3,"issuerId":null,"signature":null,"entries":[
                {"revocationId":"a","revokedAt":1,"reason":"x"},
                {"revocationId":"a","revokedAt":2,"reason":"y"}]}"#,
        );
        assert_eq!(duplicated, None);
    }
}
