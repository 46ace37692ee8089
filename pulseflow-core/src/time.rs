//! Time management for the sampling core
//!
//! Every FlowState carries a monotonic timestamp, and the Activity Monitor's
//! idle window is a pure comparison between two of them. Sources:
//! - Monotonic clock since process start (std)
//! - Hardware tick counter (implemented by the board crate)
//! - Mock clock for deterministic tests

#[cfg(target_has_atomic = "64")]
use core::sync::atomic::{AtomicU64, Ordering};

/// Timestamp in milliseconds since device boot
pub type Timestamp = u64;

/// Source of monotonic time for the Sampler
///
/// `now()` is called once per sampling cycle from the Sampler context, so
/// implementations must not block.
pub trait TimeSource: Send {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time (vs monotonic)
    fn is_wall_clock(&self) -> bool {
        false
    }

    /// Get precision in milliseconds
    fn precision_ms(&self) -> u32 {
        1
    }
}

impl<T: TimeSource + Sync> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn is_wall_clock(&self) -> bool {
        (**self).is_wall_clock()
    }

    fn precision_ms(&self) -> u32 {
        (**self).precision_ms()
    }
}

/// Monotonic clock measuring milliseconds since construction (requires std)
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: std::time::Instant::now() }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_millis() as Timestamp
    }
}

/// Controllable clock for tests
///
/// Interior-mutable so a test can advance time while a Sampler holds a
/// reference to it.
#[cfg(target_has_atomic = "64")]
#[derive(Debug, Default)]
pub struct MockTimeSource {
    now_ms: AtomicU64,
}

#[cfg(target_has_atomic = "64")]
impl MockTimeSource {
    pub const fn new(start: Timestamp) -> Self {
        Self { now_ms: AtomicU64::new(start) }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.now_ms.store(timestamp, Ordering::Relaxed);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::Relaxed);
    }
}

#[cfg(target_has_atomic = "64")]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.now_ms.load(Ordering::Relaxed)
    }
}

/// Milliseconds elapsed from `earlier` to `later`, zero if the clock went backwards
pub fn elapsed_ms(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}
