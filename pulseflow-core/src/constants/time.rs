//! Time-Related Constants
//!
//! Time intervals and conversion factors used by the Sampler and the
//! Activity Monitor.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: u64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: f32 = 60.0;

// ===== SAMPLING =====

/// Default gate interval (seconds).
///
/// One drain per second gives 1 Hz frequency resolution, the usual
/// compromise between update rate and quantization noise for hall-effect
/// flow sensors.
pub const DEFAULT_GATE_SECONDS: f32 = 1.0;

/// Shortest gate interval accepted by configuration (seconds).
///
/// Below 10 ms the drain jitter dominates the pulse count.
pub const MIN_GATE_SECONDS: f32 = 0.01;

/// Longest gate interval accepted by configuration (seconds).
///
/// Longer gates risk reaching the high-water mark on every cycle at
/// moderate flow.
pub const MAX_GATE_SECONDS: f32 = 60.0;

// ===== ACTIVITY =====

/// Default idle timeout (milliseconds).
///
/// Five minutes without qualifying flow marks the meter idle. Short enough
/// for battery-powered installs to sleep between draws, long enough not to
/// flap during intermittent use (hand washing, irrigation cycles).
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 300_000;

// ===== SYNCHRONIZATION =====

/// Lock acquisition attempts before the store reports a synchronization failure.
///
/// Critical sections copy a few dozen bytes, so a healthy writer releases
/// the lock within a handful of spins. Exhausting this budget means the
/// holder is gone, not slow.
pub const LOCK_SPIN_LIMIT: u32 = 100_000;
