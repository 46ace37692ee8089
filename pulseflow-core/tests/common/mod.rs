//! Shared fixtures for the integration tests
//!
//! - A rig bundling a meter, a mock clock and a simulated counter
//! - Pulse-train helpers for constant and bursty flow
//! - Float assertion helpers

#![allow(dead_code)]

use pulseflow_core::{
    config::FlowConfig,
    constants::COUNTER_HW_LIMIT,
    counter::SimulatedCounter,
    sampler::{CycleReport, Sampler},
    time::{MockTimeSource, TimeSource},
    FlowMeter,
};

/// Meter plus clock, driven one gate at a time
pub struct Rig {
    pub meter: FlowMeter<SimulatedCounter>,
    pub clock: MockTimeSource,
}

impl Rig {
    /// The unit starts at the hardware limit; the meter programs the
    /// configured high-water mark
    pub fn new(config: FlowConfig) -> Self {
        Self {
            meter: FlowMeter::new(config, SimulatedCounter::new(COUNTER_HW_LIMIT))
                .expect("valid test config"),
            clock: MockTimeSource::new(0),
        }
    }

    pub fn default_config() -> Self {
        Self::new(FlowConfig::default())
    }

    pub fn sampler(&self) -> Sampler<'_, SimulatedCounter, &MockTimeSource> {
        self.meter.sampler(&self.clock).expect("store readable")
    }

    /// Edges arriving during the current gate
    pub fn pulses(&self, edges: u32) {
        self.meter.counter().unit().feed(edges, self.meter.guard());
    }

    pub fn clock_now(&self) -> u64 {
        self.clock.now()
    }

    pub fn gate_ms(&self) -> u64 {
        self.meter.config().tuning.gate_period_ms()
    }
}

/// Feed `edges` then close the gate
pub fn gate(
    rig: &Rig,
    sampler: &mut Sampler<'_, SimulatedCounter, &MockTimeSource>,
    edges: u32,
) -> CycleReport {
    rig.pulses(edges);
    rig.clock.advance(rig.gate_ms());
    sampler.cycle().expect("cycle")
}

/// Pulses per gate for a steady flow of `lpm`
pub fn pulses_for_lpm(lpm: f32, pulses_per_liter: f32, gate_seconds: f32) -> u32 {
    libm::roundf(lpm / 60.0 * gate_seconds * pulses_per_liter) as u32
}

/// Deterministic bursty pulse train: quiet gates, trickles and surges
pub fn bursty_train(len: usize, seed: u32) -> Vec<u32> {
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            // xorshift32
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            match state % 4 {
                0 => 0,
                1 => state % 20,
                2 => 200 + state % 400,
                _ => 1000 + state % 2000,
            }
        })
        .collect()
}

pub fn assert_close(actual: f32, expected: f32, eps: f32) {
    assert!(
        (actual - expected).abs() < eps,
        "expected {expected} ± {eps}, got {actual}"
    );
}

pub fn assert_close_f64(actual: f64, expected: f64, eps: f64) {
    assert!(
        (actual - expected).abs() < eps,
        "expected {expected} ± {eps}, got {actual}"
    );
}
