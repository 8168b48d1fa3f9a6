//! Monotonic time sources.
//!
//! Sessions measure deadlines and character gaps against a [`Clock`]
//! rather than wall-clock time, so clock adjustments never stretch or
//! cut short a timeout.

use core::time::Duration;

/// A monotonic time source.
pub trait Clock {
    /// Time elapsed since an arbitrary, fixed origin. Never decreases.
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// `now + timeout`, saturating at `Duration::MAX` instead of overflowing.
pub(crate) fn deadline_after(now: Duration, timeout: Duration) -> Duration {
    now.checked_add(timeout).unwrap_or(Duration::MAX)
}

/// Clock backed by `std::time::Instant`.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Creates a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}
