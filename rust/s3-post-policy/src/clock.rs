//! Time sources used when signing.
//!
//! The signing key is scoped to the current UTC date, so [`Signer`](crate::Signer)
//! asks a [`Clock`] for the time instead of reading it directly. Use
//! [`FixedClock`] to make signatures reproducible.

use chrono::{DateTime, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(system_time())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn system_time() -> std::time::SystemTime {
    std::time::SystemTime::now()
}

#[cfg(target_arch = "wasm32")]
fn system_time() -> std::time::SystemTime {
    use web_time::web::SystemTimeExt;
    web_time::SystemTime::now().to_std()
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Create a clock that always reports `time`.
    pub fn new(time: DateTime<Utc>) -> Self {
        Self(time)
    }
}

impl From<DateTime<Utc>> for FixedClock {
    fn from(time: DateTime<Utc>) -> Self {
        Self(time)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
