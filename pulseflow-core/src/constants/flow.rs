//! Flow Sensor Calibration and Filtering Constants
//!
//! Defaults for the conversion from pulses to liters and for the adaptive
//! smoothing filter.

// ===== CALIBRATION =====

/// Default pulses per liter.
///
/// Bench-calibrated value for the reference hall-effect turbine sensor.
/// Real installs override it with their own calibration run.
pub const DEFAULT_PULSES_PER_LITER: f32 = 1319.0;

/// Nominal trim factor.
pub const DEFAULT_TRIM_FACTOR: f32 = 1.0;

/// Largest trim deviation accepted without a warning (±5%).
pub const TRIM_TYPICAL_DEVIATION: f32 = 0.05;

// ===== NOISE =====

/// Default noise threshold (L/min).
///
/// Instantaneous flow at or below this value is treated as jitter: it
/// neither adds volume nor marks the meter active.
pub const DEFAULT_NOISE_THRESHOLD_LPM: f32 = 0.1;

// ===== SMOOTHING =====

/// Flow above which the fast smoothing factor applies (L/min).
pub const SMOOTHING_HIGH_FLOW_LPM: f32 = 5.0;

/// Flow above which the medium smoothing factor applies (L/min).
pub const SMOOTHING_MEDIUM_FLOW_LPM: f32 = 1.0;

/// Smoothing factor for large flows. Tracks transients quickly.
pub const ALPHA_HIGH_FLOW: f32 = 0.5;

/// Smoothing factor for moderate flows.
pub const ALPHA_MEDIUM_FLOW: f32 = 0.35;

/// Smoothing factor for small or noisy flows. Heaviest damping.
pub const ALPHA_LOW_FLOW: f32 = 0.2;

/// Smoothed flow below this value snaps to zero once the input is zero (L/min).
pub const DEFAULT_ZERO_FLOOR_LPM: f32 = 0.001;

/// Maximum number of rows in a smoothing table.
pub const MAX_ALPHA_BANDS: usize = 8;
