//! Self-sovereign identity handles for CIDFeed.
//!
//! An identity is an Ed25519 keypair. Its public half is rendered as a
//! [did:key](https://w3c-ccg.github.io/did-method-key/) identifier, which is
//! the only thing other components ever see: delegations name their issuer
//! and audience by it, and revocation ledgers name their signer by it.
//!
//! ```rust
//! use cidfeed_common::Timestamp;
//! use cidfeed_credentials::{Identity, is_valid_identity_id};
//!
//! let identity = Identity::create(Timestamp::from_millis(1_700_000_000_000)).unwrap();
//! assert!(is_valid_identity_id(identity.id()));
//! ```

mod did;
mod error;
mod identity;
mod key;

pub use did::{
    DID_KEY_PREFIX, DidKeyError, decode_did_key, encode_did_key, format_handle,
    is_valid_identity_id,
};
pub use error::IdentityError;
pub use identity::{Identity, IdentityHandle, create_identity};
pub use key::{IdentityKey, SIGNATURE_LENGTH, verify_signature};
