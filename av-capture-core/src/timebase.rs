//! Shared monotonic timebase.
//!
//! Audio block timestamps, the capture-begin mark and the video reference
//! timestamp must all come from the same clock for the sync math to hold.
//! Clone one `MonotonicClock` into every component.

use std::sync::Arc;
use std::time::Instant;

/// Monotonic nanosecond clock anchored at its creation instant.
///
/// Readings start at 1 so that 0 can mean "unset" everywhere.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Arc<Instant>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Arc::new(Instant::now()),
        }
    }

    /// Create a clock from an existing start instant, to share a timebase
    /// with a component that already has one.
    pub fn from_instant(start: Instant) -> Self {
        Self {
            start: Arc::new(start),
        }
    }

    /// Nanoseconds since the clock was created, plus one.
    #[inline]
    pub fn now_ns(&self) -> u64 {
        self.ns_at(Instant::now())
    }

    /// Clock reading for an arbitrary instant (saturates before the start).
    #[inline]
    pub fn ns_at(&self, instant: Instant) -> u64 {
        instant.saturating_duration_since(*self.start).as_nanos() as u64 + 1
    }

    pub fn start_instant(&self) -> Instant {
        *self.start
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn readings_are_positive_and_monotonic() {
        let clock = MonotonicClock::new();
        let first = clock.now_ns();
        thread::sleep(Duration::from_millis(2));
        let second = clock.now_ns();
        assert!(first > 0);
        assert!(second > first);
    }

    #[test]
    fn shared_clock_agrees() {
        let a = MonotonicClock::new();
        let b = MonotonicClock::from_instant(a.start_instant());
        let now = Instant::now();
        assert_eq!(a.ns_at(now), b.ns_at(now));
    }

    #[test]
    fn instants_before_start_saturate() {
        let earlier = Instant::now();
        thread::sleep(Duration::from_millis(1));
        let clock = MonotonicClock::new();
        assert_eq!(clock.ns_at(earlier), 1);
    }
}
