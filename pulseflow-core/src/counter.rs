//! Hardware Edge Counter
//!
//! ## Overview
//!
//! Flow sensors emit one edge per fixed slice of liquid. A peripheral
//! counter (ESP32 PCNT, an STM32 timer in external-clock mode) accumulates
//! those edges without CPU involvement; the Sampler only has to *drain* it
//! once per gate interval:
//!
//! ```text
//! sensor edges ──→ hardware counter ──drain()──→ Sampler
//!                        │
//!                 high-water mark ──→ overflow interrupt ──→ OverflowGuard
//! ```
//!
//! ## The Drain Window
//!
//! `drain()` must return everything counted since the previous drain and
//! leave the counter at zero, with no edge lost between the read and the
//! clear. Implementations close that window either with a single atomic
//! swap (as [`SimulatedCounter`] does) or by masking the counter interrupt
//! around a read/clear register pair.
//!
//! ## Sharing
//!
//! The Sampler drains the unit while the overflow interrupt may clear it,
//! so every [`CounterUnit`] method takes `&self`.

use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use crate::constants::counter::COUNTER_RANGE;
use crate::overflow::OverflowGuard;

/// Hardware pulse counter abstraction
pub trait CounterUnit: Sync {
    /// Return the count since the last take and reset it to zero, atomically
    fn take(&self) -> i32;

    /// Zero the count, discarding it
    fn clear(&self) {
        let _ = self.take();
    }

    /// Stop, reprogram and restart the peripheral from zero
    fn reinitialize(&self);

    /// Count at which the overflow interrupt fires
    fn high_water(&self) -> i32;

    /// Program the overflow interrupt threshold
    fn set_high_water(&self, counts: i32);
}

/// Drain-side wrapper around a [`CounterUnit`]
#[derive(Debug)]
pub struct EdgeCounter<U> {
    unit: U,
    range: i32,
}

impl<U: CounterUnit> EdgeCounter<U> {
    pub fn new(unit: U) -> Self {
        Self { unit, range: COUNTER_RANGE }
    }

    /// Limit drains to ±`range` counts
    pub fn with_range(mut self, range: i32) -> Self {
        self.range = range.abs();
        self
    }

    /// Pulses accumulated since the previous drain; resets the counter
    pub fn drain(&self) -> i32 {
        self.unit.take().clamp(-self.range, self.range)
    }

    /// Full peripheral reinitialization
    pub fn reinitialize(&self) {
        self.unit.reinitialize();
    }

    /// The underlying unit, for the interrupt handler
    pub fn unit(&self) -> &U {
        &self.unit
    }
}

/// Software model of a pulse counter peripheral
///
/// Counts live in one atomic, so `take()` is a single swap. Feeding edges
/// through [`SimulatedCounter::feed`] reproduces the hardware's high-water
/// interrupt by calling the guard's handler whenever the count reaches the
/// mark.
#[derive(Debug)]
pub struct SimulatedCounter {
    count: AtomicI32,
    high_water: AtomicI32,
    reinitializations: AtomicU32,
}

impl SimulatedCounter {
    pub const fn new(high_water: i32) -> Self {
        Self {
            count: AtomicI32::new(0),
            high_water: AtomicI32::new(high_water),
            reinitializations: AtomicU32::new(0),
        }
    }

    /// Count `edges` rising edges, firing the overflow handler at the high-water mark
    pub fn feed(&self, edges: u32, guard: &OverflowGuard) {
        let mut remaining = edges;

        while remaining > 0 {
            let current = self.count.load(Ordering::Acquire);
            let headroom = self
                .high_water
                .load(Ordering::Acquire)
                .saturating_sub(current)
                .max(1) as u32;

            if remaining >= headroom {
                self.count.fetch_add(headroom as i32, Ordering::AcqRel);
                remaining -= headroom;
                guard.on_high_water(self);
            } else {
                self.count.fetch_add(remaining as i32, Ordering::AcqRel);
                remaining = 0;
            }
        }
    }

    /// Add a raw delta without high-water checks (glitches, reverse counts)
    pub fn inject(&self, delta: i32) {
        self.count.fetch_add(delta, Ordering::AcqRel);
    }

    /// Current count without clearing
    pub fn count(&self) -> i32 {
        self.count.load(Ordering::Acquire)
    }

    /// How many times the peripheral was reinitialized
    pub fn reinitializations(&self) -> u32 {
        self.reinitializations.load(Ordering::Relaxed)
    }
}

impl CounterUnit for SimulatedCounter {
    fn take(&self) -> i32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    fn reinitialize(&self) {
        self.count.store(0, Ordering::Release);
        self.reinitializations.fetch_add(1, Ordering::Relaxed);
    }

    fn high_water(&self) -> i32 {
        self.high_water.load(Ordering::Acquire)
    }

    fn set_high_water(&self, counts: i32) {
        self.high_water.store(counts, Ordering::Release);
    }
}

impl<U: CounterUnit + ?Sized> CounterUnit for &U {
    fn take(&self) -> i32 {
        (**self).take()
    }

    fn clear(&self) {
        (**self).clear()
    }

    fn reinitialize(&self) {
        (**self).reinitialize()
    }

    fn high_water(&self) -> i32 {
        (**self).high_water()
    }

    fn set_high_water(&self, counts: i32) {
        (**self).set_high_water(counts)
    }
}
