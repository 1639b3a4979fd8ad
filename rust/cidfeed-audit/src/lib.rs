//! The security audit trail.
//!
//! Every security relevant transition in CIDFeed is recorded as a
//! [`SecurityAuditEntry`]. Entries live in a [`SecurityAuditLog`], which keeps
//! the most recent entry first and silently drops the oldest once it holds
//! more than the configured number of entries.
//!
//! ```rust
//! use cidfeed_audit::{AuditEvent, SecurityAuditEntry, SecurityAuditLog};
//! use cidfeed_common::Timestamp;
//!
//! let entry = SecurityAuditEntry::new(
//!     AuditEvent::IdentityCreated,
//!     "Created identity",
//!     Timestamp::from_millis(1_700_000_000_000),
//! )
//! .unwrap();
//!
//! let log = SecurityAuditLog::new().append(entry, 200);
//! assert_eq!(log.len(), 1);
//! ```

mod error;
pub use error::*;

mod event;
pub use event::*;

mod entry;
pub use entry::*;

mod trail;
pub use trail::*;
