use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Below this a real sleep overshoots by more than the delay itself,
/// so `MonotonicClock::delay_us` spins instead.
const SPIN_THRESHOLD: Duration = Duration::from_millis(1);

/// Monotonic clock abstraction for every blocking wait in the controller.
///
/// - now(): returns a monotonic Instant
/// - sleep(): millisecond-scale blocking (debounce, motor rest, blink)
/// - delay_us(): microsecond-scale blocking used between step-pulse phases
/// - ms_since(): helper to compute elapsed milliseconds from an epoch Instant
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Block for `us` microseconds. Implementations should keep the error
    /// small; the step pulse cadence is built on this.
    fn delay_us(&self, us: u64) {
        self.sleep(Duration::from_micros(us));
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
    fn sleep(&self, d: Duration) {
        (**self).sleep(d);
    }
    fn delay_us(&self, us: u64) {
        (**self).delay_us(us);
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }

    fn delay_us(&self, us: u64) {
        let d = Duration::from_micros(us);
        if d >= SPIN_THRESHOLD {
            thread::sleep(d);
            return;
        }
        let deadline = Instant::now() + d;
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}

/// Deterministic clock whose time only moves when someone sleeps on it.
///
/// now() = origin + offset
/// sleep(d) advances internal time by d without actually sleeping.
///
/// Clones share the same timeline, so a simulated I/O backend holding a clone
/// sees exactly the time the controller has waited through.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Set the absolute offset relative to origin (useful for tests).
    pub fn set_offset(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = d;
        }
    }

    /// Simulated time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_advances_only_on_sleep() {
        let clock = VirtualClock::new();
        let t0 = clock.now();
        assert_eq!(clock.ms_since(t0), 0);
        clock.sleep(Duration::from_millis(150));
        clock.delay_us(500);
        assert_eq!(clock.elapsed(), Duration::from_micros(150_500));
        assert_eq!(clock.ms_since(t0), 150);
    }

    #[test]
    fn clones_share_a_timeline() {
        let a = VirtualClock::new();
        let b = a.clone();
        b.advance(Duration::from_secs(3));
        assert_eq!(a.elapsed(), Duration::from_secs(3));
        a.set_offset(Duration::from_millis(7));
        assert_eq!(b.elapsed(), Duration::from_millis(7));
    }

    #[test]
    fn ms_since_saturates_for_future_epoch() {
        let clock = VirtualClock::new();
        let future = clock.now() + Duration::from_secs(1);
        assert_eq!(clock.ms_since(future), 0);
    }

    #[test]
    fn monotonic_spin_delay_waits_at_least_requested() {
        let clock = MonotonicClock::new();
        let t0 = Instant::now();
        clock.delay_us(200);
        assert!(t0.elapsed() >= Duration::from_micros(200));
    }
}
