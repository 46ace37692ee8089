//! Constants for the PulseFlow core
//!
//! Every default tuning value lives here with its unit in the name and a
//! note on where it comes from.
//!
//! ## Organization
//!
//! - **Counter**: hardware counter range and overflow policy
//! - **Flow**: calibration, noise threshold and smoothing table
//! - **Time**: gate interval, idle timeout and lock budget

/// Hardware counter range and overflow policy.
pub mod counter;

/// Calibration, noise and smoothing defaults.
pub mod flow;

/// Sampling, activity and synchronization timing.
pub mod time;

pub use counter::{
    COUNTER_HW_LIMIT, COUNTER_RANGE, DEFAULT_OVERFLOW_HIGH_WATER, DEFAULT_OVERFLOW_MAX_COUNT,
};

pub use flow::{
    DEFAULT_NOISE_THRESHOLD_LPM, DEFAULT_PULSES_PER_LITER, DEFAULT_TRIM_FACTOR,
    ALPHA_HIGH_FLOW, ALPHA_MEDIUM_FLOW, ALPHA_LOW_FLOW,
};

pub use time::{
    MS_PER_SECOND, SECONDS_PER_MINUTE, DEFAULT_GATE_SECONDS, DEFAULT_IDLE_TIMEOUT_MS,
    LOCK_SPIN_LIMIT,
};
