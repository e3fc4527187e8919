//! Change-log timestamps.

use crate::error::{OplogError, OplogResult};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Position of an entry in the change log.
///
/// A wall-clock second plus a counter distinguishing entries written in
/// the same second. Ordering is lexicographic on `(seconds, increment)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogTimestamp {
    /// Seconds since the Unix epoch.
    pub seconds: u32,
    /// Ordinal within the second, starting at 1.
    pub increment: u32,
}

impl LogTimestamp {
    /// Creates a timestamp.
    #[must_use]
    pub const fn new(seconds: u32, increment: u32) -> Self {
        Self { seconds, increment }
    }

    /// Packs into a `u64` with the same ordering.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        ((self.seconds as u64) << 32) | self.increment as u64
    }

    /// Unpacks a value produced by [`as_u64`](Self::as_u64).
    #[must_use]
    pub const fn from_u64(packed: u64) -> Self {
        Self {
            seconds: (packed >> 32) as u32,
            increment: packed as u32,
        }
    }

    /// The timestamp for an entry written now, after `last`.
    ///
    /// Uses the current second with increment 1 when the clock has moved
    /// past `last`; otherwise stays on `last`'s second and bumps the
    /// increment, so a clock that stalls or steps back never produces a
    /// duplicate.
    #[must_use]
    pub fn next_after(last: Option<LogTimestamp>) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
            .unwrap_or(0);
        Self::next_at(last, now)
    }

    fn next_at(last: Option<LogTimestamp>, now: u32) -> Self {
        match last {
            Some(last) if now <= last.seconds => match last.increment.checked_add(1) {
                Some(increment) => Self::new(last.seconds, increment),
                None => Self::new(last.seconds.saturating_add(1), 1),
            },
            _ => Self::new(now, 1),
        }
    }
}

impl fmt::Display for LogTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seconds, self.increment)
    }
}

impl FromStr for LogTimestamp {
    type Err = OplogError;

    /// Parses `seconds:increment`, or bare `seconds` meaning increment 0.
    fn from_str(s: &str) -> OplogResult<Self> {
        let bad = || OplogError::malformed(format!("bad timestamp {s:?}"));
        let (secs, inc) = match s.split_once(':') {
            Some((secs, inc)) => (secs, inc.parse().map_err(|_| bad())?),
            None => (s, 0),
        };
        Ok(Self::new(secs.parse().map_err(|_| bad())?, inc))
    }
}
