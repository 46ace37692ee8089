//! Measurement state shared between the Sampler and its readers
//!
//! ## Memory Model
//!
//! Everything here is `Copy` and fixed-size so a full snapshot can be
//! copied in and out of the Shared State Store inside a short critical
//! section without allocating:
//!
//! ```text
//! Snapshot
//! ├── flow: FlowState          written once per cycle by the Sampler
//! ├── activity: ActivityState  derived in the Sampler's post-update step
//! ├── version: u64             bumped by the store on every write
//! └── calibration_ppl: f32     effective pulses per liter in use
//! ```
//!
//! Readers receive copies; nothing outside the Sampler holds a mutable
//! reference to any of it.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Conditions raised during one sampling cycle
///
/// Recovered errors are reported here, next to the degraded values, instead
/// of aborting the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CycleStatus {
    /// The overflow interrupt fired since the previous cycle
    pub overflow: bool,
    /// Overflow count reached its maximum and the counter was reinitialized
    pub persistent_overflow: bool,
    /// Effective pulses per liter is not positive; flow forced to zero
    pub calibration_fault: bool,
}

impl CycleStatus {
    /// No condition was raised
    pub fn is_clean(&self) -> bool {
        !(self.overflow || self.persistent_overflow || self.calibration_fault)
    }

    /// Any counter saturation, recovered locally or by reinitialization
    pub fn any_overflow(&self) -> bool {
        self.overflow || self.persistent_overflow
    }
}

/// The durable measurement record
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlowState {
    /// Pulse frequency over the last gate interval
    pub frequency_hz: f32,
    /// Smoothed flow rate (L/min)
    pub flow_rate_lpm: f32,
    /// Unsmoothed flow rate of the last cycle (L/min)
    pub instantaneous_lpm: f32,
    /// Cumulative volume (L), never decreases
    pub total_volume_l: f64,
    /// Pulses drained on the last cycle
    pub raw_count: i32,
    /// Set on a cycle that saw an overflow; cleared by the next clean drain
    pub overflow_flag: bool,
    /// Everything raised on the last cycle
    pub status: CycleStatus,
    /// Monotonic time of the last update (ms)
    pub timestamp: Timestamp,
}

/// Activity Monitor state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ActivityMode {
    /// No qualifying flow within the idle timeout
    #[default]
    Idle,
    /// Flow above the noise threshold seen recently
    Active,
}

/// Active/idle signal derived from recent flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActivityState {
    pub mode: ActivityMode,
    /// Time of the last cycle whose flow exceeded the noise threshold
    pub last_active_timestamp: Timestamp,
}

impl ActivityState {
    pub fn is_active(&self) -> bool {
        self.mode == ActivityMode::Active
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ActivityMode {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(fmt, "Idle"),
            Self::Active => defmt::write!(fmt, "Active"),
        }
    }
}

/// Atomically consistent copy of everything the Sampler publishes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    pub flow: FlowState,
    pub activity: ActivityState,
    /// Number of writes that produced this snapshot, 0 for the initial state
    pub version: u64,
    /// Effective pulses per liter used for conversion
    pub calibration_ppl: f32,
}

impl Snapshot {
    /// Zeroed startup state
    pub const fn initial(calibration_ppl: f32) -> Self {
        Self {
            flow: FlowState {
                frequency_hz: 0.0,
                flow_rate_lpm: 0.0,
                instantaneous_lpm: 0.0,
                total_volume_l: 0.0,
                raw_count: 0,
                overflow_flag: false,
                status: CycleStatus {
                    overflow: false,
                    persistent_overflow: false,
                    calibration_fault: false,
                },
                timestamp: 0,
            },
            activity: ActivityState {
                mode: ActivityMode::Idle,
                last_active_timestamp: 0,
            },
            version: 0,
            calibration_ppl,
        }
    }

    /// Read-only view handed to the reporting layer
    pub fn report(&self) -> ReportSnapshot {
        ReportSnapshot {
            flow_rate_lpm: self.flow.flow_rate_lpm,
            frequency_hz: self.flow.frequency_hz,
            total_volume_l: self.flow.total_volume_l,
            timestamp_ms: self.flow.timestamp,
            overflow: self.flow.overflow_flag,
            calibration_ppl: self.calibration_ppl,
            calibration_fault: self.flow.status.calibration_fault,
            is_active: self.activity.is_active(),
            version: self.version,
        }
    }
}

/// Snapshot structure exposed to the reporting collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReportSnapshot {
    pub flow_rate_lpm: f32,
    pub frequency_hz: f32,
    pub total_volume_l: f64,
    pub timestamp_ms: u64,
    pub overflow: bool,
    pub calibration_ppl: f32,
    pub calibration_fault: bool,
    pub is_active: bool,
    pub version: u64,
}

impl ReportSnapshot {
    /// Same values rounded for display: rates to 2 decimals, volume to 3
    pub fn rounded(&self) -> Self {
        Self {
            flow_rate_lpm: round_to(self.flow_rate_lpm, 100.0),
            frequency_hz: round_to(self.frequency_hz, 100.0),
            total_volume_l: libm::round(self.total_volume_l * 1000.0) / 1000.0,
            ..*self
        }
    }

    /// JSON document for the reporting layer
    #[cfg(feature = "std")]
    pub fn to_json(&self) -> String {
        // Plain numbers and bools only, serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn round_to(value: f32, scale: f32) -> f32 {
    libm::roundf(value * scale) / scale
}

/// Health counters for the measurement pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    /// Sampling cycles published
    pub cycles: u64,
    /// Overflow interrupts since boot, never reset
    pub overflow_events: u32,
    /// Overflows in the current window, reset on reinitialization
    pub pending_overflows: u32,
    /// Counts discarded by overflow clears
    pub dropped_pulses: u32,
    /// Full counter reinitializations performed
    pub reinitializations: u32,
    /// Cycles that ran with an unusable calibration
    pub calibration_faults: u32,
}
