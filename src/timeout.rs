use serde::Deserialize;
use std::num::NonZeroU64;
use std::time::Duration;

/// Non-zero request timeout, configured in milliseconds
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(from = "NonZeroU64")]
pub struct Timeout(Duration);

impl Timeout {
    pub const DEFAULT_MILLIS: u64 = 2000;

    pub fn new(duration: Duration) -> Option<Self> {
        if duration.is_zero() {
            None
        } else {
            Some(Self(duration))
        }
    }

    pub fn from_non_zero_millis(millis: NonZeroU64) -> Self {
        Self(Duration::from_millis(millis.get()))
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self(Duration::from_millis(Self::DEFAULT_MILLIS))
    }
}

impl From<NonZeroU64> for Timeout {
    fn from(millis: NonZeroU64) -> Self {
        Self::from_non_zero_millis(millis)
    }
}

impl From<Timeout> for Duration {
    fn from(timeout: Timeout) -> Self {
        timeout.0
    }
}
