//! Overflow Guard: counter saturation handling in interrupt context
//!
//! ## Two Tiers
//!
//! ```text
//! Interrupt context (OverflowGuard::on_high_water)
//!   ├── overflow_count += 1
//!   ├── overflow_flag = true
//!   └── clear hardware counter
//!
//! Sampler context (after its drain)
//!   └── overflow_count >= max ?
//!         ├── reinitialize counter peripheral
//!         └── overflow_count = 0
//! ```
//!
//! The handler touches atomics only: no lock, no logging, no allocation.
//! Anything heavier is deferred to the Sampler's post-read step.
//!
//! ## Memory Ordering
//!
//! - **Release** on the flag store so the Sampler's Acquire swap sees the
//!   count increment that preceded it.
//! - **Relaxed** for the diagnostic totals, which never gate control flow.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::counter::CounterUnit;

/// Interrupt-safe overflow bookkeeping
#[derive(Debug, Default)]
pub struct OverflowGuard {
    /// Overflows in the current window, reset on reinitialization
    overflow_count: AtomicU32,
    /// Set by the handler, cleared when the Sampler reads it
    overflow_flag: AtomicBool,
    /// Lifetime total, never reset
    overflow_events: AtomicU32,
    /// Counts discarded by handler clears
    dropped_pulses: AtomicU32,
}

impl OverflowGuard {
    pub const fn new() -> Self {
        Self {
            overflow_count: AtomicU32::new(0),
            overflow_flag: AtomicBool::new(false),
            overflow_events: AtomicU32::new(0),
            dropped_pulses: AtomicU32::new(0),
        }
    }

    /// Interrupt handler body for the high-water interrupt
    pub fn on_high_water<U: CounterUnit + ?Sized>(&self, unit: &U) {
        self.overflow_count.fetch_add(1, Ordering::AcqRel);
        self.overflow_events.fetch_add(1, Ordering::Relaxed);
        self.overflow_flag.store(true, Ordering::Release);

        let discarded = unit.take();
        self.dropped_pulses
            .fetch_add(discarded.unsigned_abs(), Ordering::Relaxed);
    }

    /// Read and clear the sticky overflow flag
    pub fn take_overflow(&self) -> bool {
        self.overflow_flag.swap(false, Ordering::AcqRel)
    }

    /// Reset the window count once it has reached `max`
    ///
    /// Returns the count that triggered recovery. The caller must
    /// reinitialize the counter peripheral.
    pub fn try_recover(&self, max: u32) -> Option<u32> {
        if self.overflow_count.load(Ordering::Acquire) < max {
            return None;
        }
        Some(self.overflow_count.swap(0, Ordering::AcqRel))
    }

    /// Overflows in the current window
    pub fn pending(&self) -> u32 {
        self.overflow_count.load(Ordering::Acquire)
    }

    /// Overflows since boot
    pub fn overflow_events(&self) -> u32 {
        self.overflow_events.load(Ordering::Relaxed)
    }

    pub fn dropped_pulses(&self) -> u32 {
        self.dropped_pulses.load(Ordering::Relaxed)
    }

    /// Clear window count and flag (hard reset); lifetime totals are kept
    pub fn reset(&self) {
        self.overflow_count.store(0, Ordering::Release);
        self.overflow_flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::SimulatedCounter;

    #[test]
    fn handler_counts_flags_and_clears() {
        let guard = OverflowGuard::new();
        let unit = SimulatedCounter::new(30_000);
        unit.inject(30_000);

        guard.on_high_water(&unit);

        assert_eq!(guard.pending(), 1);
        assert_eq!(guard.overflow_events(), 1);
        assert_eq!(guard.dropped_pulses(), 30_000);
        assert_eq!(unit.count(), 0);
    }

    #[test]
    fn flag_is_sticky_until_read() {
        let guard = OverflowGuard::new();
        let unit = SimulatedCounter::new(10);

        guard.on_high_water(&unit);
        assert!(guard.take_overflow());
        assert!(!guard.take_overflow());
    }

    #[test]
    fn recovery_resets_exactly_at_max() {
        let guard = OverflowGuard::new();
        let unit = SimulatedCounter::new(10);

        for _ in 0..9 {
            guard.on_high_water(&unit);
        }
        assert_eq!(guard.try_recover(10), None);
        assert_eq!(guard.pending(), 9);

        guard.on_high_water(&unit);
        assert_eq!(guard.try_recover(10), Some(10));
        assert_eq!(guard.pending(), 0);

        // Lifetime total survives recovery
        assert_eq!(guard.overflow_events(), 10);
    }

    #[test]
    fn reset_keeps_lifetime_totals() {
        let guard = OverflowGuard::new();
        let unit = SimulatedCounter::new(10);
        guard.on_high_water(&unit);

        guard.reset();
        assert_eq!(guard.pending(), 0);
        assert!(!guard.take_overflow());
        assert_eq!(guard.overflow_events(), 1);
    }
}
