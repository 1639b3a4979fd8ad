//! Revocation for CIDFeed delegations.
//!
//! Three aggregates live here, each a plain value that transitions by being
//! consumed and returned:
//!
//! - [`RevocationLedger`]: the signed, upsert-only list of revoked grants,
//!   judged against a [`TrustedIssuerSet`] before it is relied upon.
//! - [`OfflineRevocationQueue`]: revocations waiting for confirmed external
//!   propagation. Replay only splits off a batch; entries leave the queue
//!   when the caller acknowledges a confirmed flush.
//! - [`FailedFlushRetries`]: per-revocation failure counts and the next
//!   instant a retry is due.
//!
//! The engine never performs a flush itself. Callers run the transport and
//! feed its [`FlushOutcome`] back in.

mod error;
pub use error::*;

mod ledger;
pub use ledger::*;

mod trust;
pub use trust::*;

mod queue;
pub use queue::*;

mod retry;
pub use retry::*;

mod flush;
pub use flush::*;
