//! The caller side of the CIDFeed security engine.
//!
//! The engine crates are pure transformations over plain values. This crate
//! owns the one authoritative copy of each aggregate in a [`SecurityState`]
//! and wires it to the two outside collaborators:
//!
//! - a [`StateStore`] that persists opaque blobs by key, and
//! - a [`RevocationFlush`] transport that propagates queued revocations.
//!
//! Neither collaborator is ever retried by the engine. [`SecurityState::replay_offline`]
//! runs one pass and records the outcome; scheduling the next pass is the
//! caller's concern.

mod error;
pub use error::*;

mod settings;
pub use settings::*;

mod store;
pub use store::*;

mod transport;
pub use transport::*;

mod state;
pub use state::*;

mod replay;
pub use replay::*;

mod persist;
pub use persist::*;

mod snapshot;
pub use snapshot::*;
