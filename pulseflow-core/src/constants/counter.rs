//! Pulse Counter Limits
//!
//! Limits of the hardware edge counter and the overflow policy built on
//! top of it. Values follow the 16-bit signed pulse counters found on
//! common MCUs (ESP32 PCNT, STM32 timers in encoder mode).

/// Hardware counter saturation limit (counts).
///
/// The ESP32 PCNT unit counts in a signed 16-bit register.
///
/// Source: ESP32 Technical Reference Manual, PCNT chapter
pub const COUNTER_HW_LIMIT: i32 = i16::MAX as i32;

/// Usable counter range reported by drains (counts).
///
/// Drains are clamped to ±this value so a misbehaving peripheral cannot
/// inject counts the hardware could never hold.
pub const COUNTER_RANGE: i32 = 30_000;

/// Default high-water mark that raises the overflow interrupt (counts).
///
/// Sits below `COUNTER_HW_LIMIT` so the interrupt handler clears the
/// register before it can wrap.
pub const DEFAULT_OVERFLOW_HIGH_WATER: i32 = 30_000;

/// Default overflow count that triggers a full counter reinitialization.
///
/// Ten consecutive overflows without a successful drain means the counter
/// or its clock gating is stuck.
pub const DEFAULT_OVERFLOW_MAX_COUNT: u32 = 10;
