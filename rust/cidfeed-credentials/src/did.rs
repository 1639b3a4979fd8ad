//! `did:key` encoding for Ed25519 public keys.

use base58::{FromBase58, ToBase58};
use ed25519_dalek::VerifyingKey;
use thiserror::Error;

/// Scheme literal plus the base58btc multibase prefix `z`.
pub const DID_KEY_PREFIX: &str = "did:key:z";

/// Multicodec tag for an Ed25519 public key (varint `0xed`).
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// A 34 byte tagged key never encodes to fewer base58 characters than this.
const MIN_BASE58_LENGTH: usize = 46;

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Ids longer than this are abbreviated by [`format_handle`].
const DISPLAY_LIMIT: usize = 24;
const DISPLAY_HEAD: usize = 14;
const DISPLAY_TAIL: usize = 6;

/// Errors that can occur when decoding a `did:key` into an Ed25519 key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DidKeyError {
    /// The DID header is invalid.
    #[error("invalid did header")]
    InvalidDidHeader,

    /// The base58 prefix 'z' is missing.
    #[error("missing base58 prefix 'z'")]
    MissingBase58Prefix,

    /// The base58 encoding is invalid.
    #[error("invalid base58 encoding")]
    InvalidBase58,

    /// The key bytes are invalid.
    #[error("invalid key bytes")]
    InvalidKey,
}

/// Renders raw Ed25519 public key bytes as a `did:key` identifier.
#[must_use]
pub fn encode_did_key(public_key: &[u8; 32]) -> String {
    let mut raw_bytes = Vec::with_capacity(34);
    raw_bytes.extend_from_slice(&ED25519_MULTICODEC);
    raw_bytes.extend_from_slice(public_key);
    format!("{DID_KEY_PREFIX}{}", raw_bytes.to_base58())
}

/// Decodes a `did:key` identifier back into an Ed25519 verifying key.
///
/// # Errors
///
/// Returns a [`DidKeyError`] if the header, multibase prefix, base58 body,
/// multicodec tag or curve point is invalid.
pub fn decode_did_key(id: &str) -> Result<VerifyingKey, DidKeyError> {
    let parts: Vec<&str> = id.split(':').collect();
    if parts.len() != 3 || parts[0] != "did" || parts[1] != "key" {
        return Err(DidKeyError::InvalidDidHeader);
    }
    let b58 = parts[2]
        .strip_prefix('z')
        .ok_or(DidKeyError::MissingBase58Prefix)?;
    let key_bytes = b58.from_base58().map_err(|_| DidKeyError::InvalidBase58)?;
    let raw = <[u8; 34]>::try_from(key_bytes.as_slice()).map_err(|_| DidKeyError::InvalidKey)?;
    if raw[..2] != ED25519_MULTICODEC {
        return Err(DidKeyError::InvalidKey);
    }
    let key: [u8; 32] = raw[2..]
        .try_into()
        .map_err(|_| DidKeyError::InvalidKey)?;
    VerifyingKey::from_bytes(&key).map_err(|_| DidKeyError::InvalidKey)
}

/// Structural check for identity ids received from untrusted input.
///
/// Accepts the `did:key:z` prefix followed by at least
/// [`MIN_BASE58_LENGTH`] characters of the base58btc alphabet. This does not
/// decode the key; a structurally valid id may still fail
/// [`decode_did_key`].
#[must_use]
pub fn is_valid_identity_id(id: &str) -> bool {
    let Some(body) = id.strip_prefix(DID_KEY_PREFIX) else {
        return false;
    };
    body.len() >= MIN_BASE58_LENGTH && body.bytes().all(|b| BASE58_ALPHABET.contains(&b))
}

/// Abbreviates long ids to a `head…tail` form for display.
///
/// Purely cosmetic: never compare or store the result.
#[must_use]
pub fn format_handle(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= DISPLAY_LIMIT {
        return id.to_owned();
    }
    let head: String = chars[..DISPLAY_HEAD].iter().collect();
    let tail: String = chars[chars.len() - DISPLAY_TAIL..].iter().collect();
    format!("{head}…{tail}")
}
