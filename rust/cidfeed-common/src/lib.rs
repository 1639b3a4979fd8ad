#![warn(missing_docs)]

//! Light weight helpers shared by the CIDFeed security crates: a
//! millisecond [`Timestamp`] that every time-dependent operation receives
//! explicitly, and the defensive decoding helpers used wherever persisted
//! or imported JSON crosses back into the engine.

mod time;
pub use time::*;

mod json;
pub use json::*;

mod sync;
pub use sync::*;
