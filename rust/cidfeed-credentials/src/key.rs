//! Ed25519 signing keys behind identity handles.

use crate::{
    did::{decode_did_key, encode_did_key},
    error::IdentityError,
};
use ed25519_dalek::{Signature, Signer, SigningKey};

/// Length in bytes of an Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// An Ed25519 keypair together with its `did:key` id.
///
/// The id is derived once at construction so that callers can borrow it
/// cheaply wherever an issuer id is needed.
#[derive(Clone)]
pub struct IdentityKey {
    id: String,
    signing_key: SigningKey,
}

impl IdentityKey {
    /// Generate a new keypair using random bytes from `getrandom`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform entropy source is unavailable.
    pub fn generate() -> Result<Self, IdentityError> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed)?;
        Ok(Self::import(&seed))
    }

    /// Rebuild a keypair from its 32 byte seed.
    #[must_use]
    pub fn import(seed: &[u8; 32]) -> Self {
        SigningKey::from_bytes(seed).into()
    }

    /// Rebuild a keypair from a seed of unchecked length.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidSeedLength`] unless `seed` is exactly 32 bytes.
    pub fn import_slice(seed: &[u8]) -> Result<Self, IdentityError> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| IdentityError::InvalidSeedLength(seed.len()))?;
        Ok(Self::import(&seed))
    }

    /// Export the raw seed bytes.
    #[must_use]
    pub fn export(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// The `did:key` id of this keypair.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sign a message.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl From<SigningKey> for IdentityKey {
    fn from(signing_key: SigningKey) -> Self {
        let id = encode_did_key(&signing_key.verifying_key().to_bytes());
        Self { id, signing_key }
    }
}

impl std::fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityKey").field("id", &self.id).finish()
    }
}

/// Verify `signature` over `message` against the key named by `id`.
///
/// Returns `false` rather than an error for every failure mode: an id that
/// does not decode to an Ed25519 key, a signature of the wrong length, or a
/// signature that does not match.
#[must_use]
pub fn verify_signature(id: &str, message: &[u8], signature: &[u8]) -> bool {
    let Ok(verifying_key) = decode_did_key(id) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    verifying_key.verify_strict(message, &signature).is_ok()
}
