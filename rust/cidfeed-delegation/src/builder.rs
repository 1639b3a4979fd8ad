//! Issuing delegation grants.

use crate::{
    Capability, DelegationError, DelegationGrant, GRANT_SCHEMA_VERSION, RevocationId,
};
use base58::ToBase58;
use cidfeed_common::{Duration, Timestamp};
use cidfeed_credentials::is_valid_identity_id;
use serde::Serialize;

/// Lifetime used when the caller does not ask for one.
pub const DEFAULT_TTL_SECONDS: u64 = 3_600;

/// Shortest permitted lifetime.
pub const MIN_TTL_SECONDS: u64 = 60;

/// Longest permitted lifetime (365 days).
pub const MAX_TTL_SECONDS: u64 = 31_536_000;

const NONCE_LENGTH: usize = 16;
const REVOCATION_ID_PREFIX: &str = "revoke-";

/// Builder for [`DelegationGrant`]s.
///
/// Everything except issuer, audience and at least one capability has a
/// default: a one hour lifetime, issuance at the wall clock, a random nonce
/// and a revocation id derived from the grant content.
///
/// ```rust
/// use cidfeed_common::Timestamp;
/// use cidfeed_credentials::IdentityKey;
/// use cidfeed_delegation::DelegationGrant;
///
/// let issuer = IdentityKey::import(&[1; 32]);
/// let audience = IdentityKey::import(&[2; 32]);
///
/// let grant = DelegationGrant::builder()
///     .issuer(issuer.id())
///     .audience(audience.id())
///     .capability(issuer.id(), "feed/publish")
///     .ttl_seconds(120)
///     .issued_at(Timestamp::from_millis(1_700_000_000_000))
///     .try_build()
///     .unwrap();
///
/// assert_eq!(grant.expires_at(), Timestamp::from_millis(1_700_000_120_000));
/// ```
#[derive(Debug, Clone)]
pub struct DelegationBuilder {
    issuer: Option<String>,
    audience: Option<String>,
    capabilities: Vec<(String, String)>,
    ttl_seconds: u64,
    issued_at: Option<Timestamp>,
    revocation_id: Option<RevocationId>,
    nonce: Option<String>,
}

impl Default for DelegationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DelegationBuilder {
    /// Creates a blank builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            issuer: None,
            audience: None,
            capabilities: Vec::new(),
            ttl_seconds: DEFAULT_TTL_SECONDS,
            issued_at: None,
            revocation_id: None,
            nonce: None,
        }
    }

    /// Sets the issuing identity id.
    #[must_use]
    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Sets the audience identity id.
    #[must_use]
    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Adds a capability. Both parts are trimmed when the grant is built.
    #[must_use]
    pub fn capability(mut self, resource: impl Into<String>, action: impl Into<String>) -> Self {
        self.capabilities.push((resource.into(), action.into()));
        self
    }

    /// Adds already validated capabilities.
    #[must_use]
    pub fn capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(
            capabilities
                .into_iter()
                .map(|c| (c.resource().to_owned(), c.action().to_owned())),
        );
        self
    }

    /// Sets the requested lifetime in seconds.
    #[must_use]
    pub const fn ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Sets the issuance instant.
    #[must_use]
    pub const fn issued_at(mut self, issued_at: Timestamp) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    /// Uses a caller supplied revocation id instead of deriving one.
    #[must_use]
    pub fn revocation_id(mut self, revocation_id: impl Into<RevocationId>) -> Self {
        self.revocation_id = Some(revocation_id.into());
        self
    }

    /// Uses a caller supplied nonce instead of a random one.
    #[must_use]
    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Validates the request and issues the grant.
    ///
    /// Checks run in a fixed order: identities, capability count, lifetime,
    /// then each capability.
    ///
    /// # Errors
    ///
    /// Returns the first [`DelegationError`] the request violates.
    pub fn try_build(self) -> Result<DelegationGrant, DelegationError> {
        let issuer = checked_identity(self.issuer)?;
        let audience = checked_identity(self.audience)?;

        if self.capabilities.is_empty() {
            return Err(DelegationError::EmptyCapabilities);
        }
        if !(MIN_TTL_SECONDS..=MAX_TTL_SECONDS).contains(&self.ttl_seconds) {
            return Err(DelegationError::TtlOutOfRange(self.ttl_seconds));
        }
        let capabilities = self
            .capabilities
            .iter()
            .map(|(resource, action)| Capability::new(resource, action))
            .collect::<Result<Vec<_>, _>>()?;

        let issued_at = self.issued_at.unwrap_or_else(Timestamp::now);
        let expires_at = issued_at
            .checked_add(Duration::from_secs(self.ttl_seconds))
            .ok_or(DelegationError::ExpiryOverflow)?;

        let nonce = match self.nonce {
            Some(nonce) if nonce.trim().is_empty() => return Err(DelegationError::EmptyNonce),
            Some(nonce) => nonce,
            None => random_nonce()?,
        };

        let revocation_id = match self.revocation_id {
            Some(id) if id.is_blank() => return Err(DelegationError::EmptyRevocationId),
            Some(id) => id,
            None => derive_revocation_id(&GrantContent {
                issuer: &issuer,
                audience: &audience,
                capabilities: &capabilities,
                issued_at,
                expires_at,
                nonce: &nonce,
            })?,
        };

        tracing::debug!(
            %issuer,
            %audience,
            %revocation_id,
            capabilities = capabilities.len(),
            "Issued delegation"
        );

        Ok(DelegationGrant {
            issuer,
            audience,
            capabilities,
            issued_at,
            expires_at,
            revocation_id,
            nonce,
            schema_version: GRANT_SCHEMA_VERSION,
        })
    }
}

fn checked_identity(id: Option<String>) -> Result<String, DelegationError> {
    match id {
        Some(id) if is_valid_identity_id(&id) => Ok(id),
        Some(id) => Err(DelegationError::InvalidIdentity(id)),
        None => Err(DelegationError::InvalidIdentity(String::new())),
    }
}

fn random_nonce() -> Result<String, DelegationError> {
    let mut bytes = [0u8; NONCE_LENGTH];
    getrandom::getrandom(&mut bytes)?;
    Ok(bytes.to_base58())
}

/// The grant fields a derived revocation id commits to.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrantContent<'a> {
    issuer: &'a str,
    audience: &'a str,
    capabilities: &'a [Capability],
    issued_at: Timestamp,
    expires_at: Timestamp,
    nonce: &'a str,
}

fn derive_revocation_id(content: &GrantContent<'_>) -> Result<RevocationId, DelegationError> {
    let bytes = serde_ipld_dagcbor::to_vec(content)
        .map_err(|error| DelegationError::Canonicalize(error.to_string()))?;
    let digest = blake3::hash(&bytes);
    Ok(RevocationId::new(format!(
        "{REVOCATION_ID_PREFIX}{}",
        digest.as_bytes().to_base58()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidfeed_credentials::IdentityKey;
    use pretty_assertions::assert_eq;

    fn ids() -> (String, String) {
        (
            IdentityKey::import(&[1; 32]).id().to_owned(),
            IdentityKey::import(&[2; 32]).id().to_owned(),
        )
    }

    fn request() -> DelegationBuilder {
        let (issuer, audience) = ids();
        DelegationBuilder::new()
            .issuer(issuer.clone())
            .audience(audience)
            .capability(issuer, "feed/publish")
            .issued_at(Timestamp::from_millis(1_000))
    }

    #[test]
    fn it_defaults_to_a_one_hour_lifetime() {
        let grant = request().try_build().unwrap();
        assert_eq!(
            grant.expires_at(),
            Timestamp::from_millis(1_000 + DEFAULT_TTL_SECONDS * 1_000)
        );
        assert_eq!(grant.schema_version(), GRANT_SCHEMA_VERSION);
    }

    #[test]
    fn it_checks_identities_before_anything_else() {
        let result = DelegationBuilder::new()
            .issuer("not-a-did")
            .audience("also-not")
            .ttl_seconds(1)
            .try_build();
        assert!(matches!(result, Err(DelegationError::InvalidIdentity(id)) if id == "not-a-did"));

        let result = DelegationBuilder::new().try_build();
        assert!(matches!(result, Err(DelegationError::InvalidIdentity(_))));
    }

    #[test]
    fn it_checks_capability_count_before_ttl() {
        let (issuer, audience) = ids();
        let result = DelegationBuilder::new()
            .issuer(issuer)
            .audience(audience)
            .ttl_seconds(1)
            .try_build();
        assert!(matches!(result, Err(DelegationError::EmptyCapabilities)));
    }

    #[test]
    fn it_checks_ttl_before_capability_contents() {
        let result = request().capability(" ", "x").ttl_seconds(30).try_build();
        assert!(matches!(result, Err(DelegationError::TtlOutOfRange(30))));

        let result = request().capability(" ", "x").try_build();
        assert!(matches!(result, Err(DelegationError::InvalidCapability)));
    }

    #[test]
    fn it_accepts_both_ttl_bounds() {
        assert!(request().ttl_seconds(MIN_TTL_SECONDS).try_build().is_ok());
        assert!(request().ttl_seconds(MAX_TTL_SECONDS).try_build().is_ok());
        assert!(request().ttl_seconds(MIN_TTL_SECONDS - 1).try_build().is_err());
        assert!(request().ttl_seconds(MAX_TTL_SECONDS + 1).try_build().is_err());
    }

    #[test]
    fn it_derives_revocation_ids_from_content() {
        let first = request().nonce("fixed").try_build().unwrap();
        let second = request().nonce("fixed").try_build().unwrap();
        let third = request().nonce("other").try_build().unwrap();

        assert!(first.revocation_id().as_str().starts_with(REVOCATION_ID_PREFIX));
        assert_eq!(first.revocation_id(), second.revocation_id());
        assert_ne!(first.revocation_id(), third.revocation_id());
        assert_eq!(first, second);
    }

    #[test]
    fn it_mints_random_nonces() {
        let first = request().try_build().unwrap();
        let second = request().try_build().unwrap();
        assert_ne!(first.nonce(), second.nonce());
        assert_ne!(first.revocation_id(), second.revocation_id());
    }

    #[test]
    fn it_keeps_supplied_revocation_ids() {
        let grant = request().revocation_id("revoke-1").try_build().unwrap();
        assert_eq!(grant.revocation_id().as_str(), "revoke-1");
    }

    #[test]
    fn it_rejects_blank_supplied_values() {
        assert!(matches!(
            request().revocation_id("  ").try_build(),
            Err(DelegationError::EmptyRevocationId)
        ));
        assert!(matches!(
            request().nonce("").try_build(),
            Err(DelegationError::EmptyNonce)
        ));
    }

    #[test]
    fn it_rejects_expiry_overflow() {
        let result = request()
            .issued_at(Timestamp::from_millis(u64::MAX - 10))
            .try_build();
        assert!(matches!(result, Err(DelegationError::ExpiryOverflow)));
    }
}
