//! Cross-platform time utilities.
//!
//! Nothing in the security engine samples a clock on its own. Callers obtain
//! a [`Timestamp`] (from [`Timestamp::now`] in production, from fixed values
//! in tests) and pass it into every time-dependent operation.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
///
/// Serialized as a bare JSON number so that persisted blobs keep the
/// `createdAt: 1700000000000` shape.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Reads the wall clock.
    ///
    /// Only callers at the edge of the system should use this; engine
    /// operations take the current time as an argument.
    #[must_use]
    pub fn now() -> Self {
        let elapsed = now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }

    /// Adds a duration, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        let millis = u64::try_from(duration.as_millis()).ok()?;
        self.0.checked_add(millis).map(Self)
    }

    /// Adds a duration, clamping at the largest representable timestamp.
    #[must_use]
    pub fn saturating_add(&self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// The time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    #[must_use]
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Renders the timestamp as an ISO-8601 UTC string with millisecond
    /// precision, e.g. `2023-11-14T22:13:20.000Z`.
    ///
    /// Returns `None` for instants outside the range the calendar can
    /// represent.
    #[must_use]
    pub fn to_iso8601(&self) -> Option<String> {
        let millis = i64::try_from(self.0).ok()?;
        DateTime::from_timestamp_millis(millis)
            .map(|time| time.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_iso8601() {
            Some(iso) => f.write_str(&iso),
            None => write!(f, "{}ms", self.0),
        }
    }
}

/// Returns the current system time.
///
/// Uses `std::time::SystemTime::now()` on native and `web_time::SystemTime::now().to_std()`
/// on WASM.
#[cfg(not(target_arch = "wasm32"))]
pub fn now() -> SystemTime {
    SystemTime::now()
}

/// Returns the current system time.
///
/// Uses `std::time::SystemTime::now()` on native and `web_time::SystemTime::now().to_std()`
/// on WASM.
#[cfg(target_arch = "wasm32")]
pub fn now() -> SystemTime {
    use web_time::web::SystemTimeExt;
    web_time::SystemTime::now().to_std()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_renders_iso_8601_with_milliseconds() {
        let timestamp = Timestamp::from_millis(1_700_000_000_000);
        assert_eq!(
            timestamp.to_iso8601().as_deref(),
            Some("2023-11-14T22:13:20.000Z")
        );
        assert_eq!(timestamp.to_string(), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn it_falls_back_to_millis_when_out_of_calendar_range() {
        let timestamp = Timestamp::from_millis(u64::MAX);
        assert_eq!(timestamp.to_iso8601(), None);
        assert_eq!(timestamp.to_string(), format!("{}ms", u64::MAX));
    }

    #[test]
    fn it_adds_durations() {
        let start = Timestamp::from_millis(1_000);
        assert_eq!(
            start.checked_add(Duration::from_secs(2)),
            Some(Timestamp::from_millis(3_000))
        );
        assert_eq!(
            Timestamp::from_millis(u64::MAX).checked_add(Duration::from_millis(1)),
            None
        );
        assert_eq!(
            Timestamp::from_millis(u64::MAX).saturating_add(Duration::from_millis(1)),
            Timestamp::from_millis(u64::MAX)
        );
    }

    #[test]
    fn it_measures_elapsed_time_without_underflow() {
        let early = Timestamp::from_millis(1_000);
        let late = Timestamp::from_millis(4_500);
        assert_eq!(
            late.saturating_duration_since(early),
            Duration::from_millis(3_500)
        );
        assert_eq!(early.saturating_duration_since(late), Duration::ZERO);
    }

    #[test]
    fn it_serializes_as_a_bare_number() {
        let json = serde_json::to_string(&Timestamp::from_millis(42)).unwrap();
        assert_eq!(json, "42");
        let parsed: Timestamp = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, Timestamp::from_millis(42));
        assert!(serde_json::from_str::<Timestamp>("-1").is_err());
        assert!(serde_json::from_str::<Timestamp>("1.5").is_err());
    }

    #[test]
    fn it_returns_reasonable_timestamp() {
        // Should be after year 2020
        assert!(Timestamp::now().as_millis() > 1_577_836_800_000);
    }
}
