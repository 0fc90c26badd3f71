//! Modification timestamps used as freshness tokens.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A modification timestamp truncated to whole seconds since the Unix epoch.
///
/// All freshness comparisons in kiln happen at second granularity so that
/// stamps survive storage in backends that only hold an integer (the
/// key-value store) and transfer between filesystems with coarse mtime
/// resolution. Pre-epoch times clamp to zero.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp(u64);

impl Stamp {
    /// The current wall-clock time, truncated to seconds.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    /// Wraps a raw count of seconds since the Unix epoch.
    pub fn from_unix_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Converts a [`SystemTime`] (e.g. a file's mtime) to a stamp.
    pub fn from_system_time(time: SystemTime) -> Self {
        let secs = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    /// The stamp as seconds since the Unix epoch.
    pub fn as_unix_secs(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stamp({})", self.0)
    }
}
