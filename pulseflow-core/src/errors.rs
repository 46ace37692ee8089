//! Error Types for the Flow Measurement Core
//!
//! ## Design Philosophy
//!
//! Errors here travel through the sampling hot path, so they follow the same
//! rules as everything else the Sampler touches:
//!
//! 1. **Small Size**: every variant is a handful of bytes and `Copy`.
//!
//! 2. **No Heap Allocation**: messages are `&'static str`, never `String`.
//!
//! 3. **Not Exceptions**: recoverable conditions (overflow, bad calibration)
//!    are reported *alongside* a degraded snapshot through [`CycleStatus`],
//!    not instead of it. Only conditions the core cannot recover from are
//!    returned as `Err`.
//!
//! ## Error Categories
//!
//! ### Recovered Locally
//! - `Overflow`: the counter hit its high-water mark; the interrupt handler
//!   cleared it.
//! - `PersistentOverflow`: too many overflows in one window; the Sampler
//!   reinitialized the counter.
//! - `Calibration`: effective pulses-per-liter is not positive; flow reads zero
//!   until the configuration is fixed.
//!
//! ### Fatal
//! - `SynchronizationFailure`: the Shared State Store could not be locked
//!   within its spin budget. The caller is expected to restart the process.
//!
//! ### Startup
//! - `InvalidConfig` / `ConfigLoad`: rejected tuning constants or an
//!   unreadable configuration document.
//! - `SamplerActive`: a second Sampler was requested for a meter that
//!   already has one.
//!
//! ```rust
//! use pulseflow_core::FlowError;
//!
//! fn on_sampler_exit(err: FlowError) {
//!     if err.is_fatal() {
//!         // restart_process();
//!     }
//! }
//! # on_sampler_exit(FlowError::SynchronizationFailure);
//! ```
//!
//! [`CycleStatus`]: crate::state::CycleStatus

use thiserror_no_std::Error;

/// Result type for flow measurement operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Flow measurement errors - kept small for embedded use
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum FlowError {
    /// Hardware counter reached its high-water mark and was cleared
    #[error("Pulse counter reached high-water mark {high_water}")]
    Overflow {
        /// Configured high-water mark in counts
        high_water: i32,
    },

    /// Overflow count reached its window maximum; counter was reinitialized
    #[error("Persistent overflow: {count} overflows in window (max {max})")]
    PersistentOverflow {
        /// Overflows observed when recovery ran
        count: u32,
        /// Configured maximum per window
        max: u32,
    },

    /// Effective pulses-per-liter is not usable for conversion
    #[error("Calibration error: effective pulses per liter {effective_ppl} is not positive")]
    Calibration {
        /// `pulses_per_liter * trim_factor`
        effective_ppl: f32,
    },

    /// Shared State Store lock could not be acquired within the spin budget
    #[error("Synchronization failure: shared state store unavailable")]
    SynchronizationFailure,

    /// The meter already has a running Sampler
    #[error("Sampler already running for this meter")]
    SamplerActive,

    /// A configuration value was rejected at startup
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },

    /// Configuration document could not be read or parsed
    #[error("Configuration load failed: {reason}")]
    ConfigLoad {
        reason: &'static str,
    },
}

impl FlowError {
    /// Whether the process must restart after this error
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SynchronizationFailure)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FlowError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Overflow { high_water } =>
                defmt::write!(fmt, "Counter overflow at {}", high_water),
            Self::PersistentOverflow { count, max } =>
                defmt::write!(fmt, "Persistent overflow {}/{}", count, max),
            Self::Calibration { effective_ppl } =>
                defmt::write!(fmt, "Bad calibration ppl={}", effective_ppl),
            Self::SynchronizationFailure =>
                defmt::write!(fmt, "Store lock unavailable"),
            Self::SamplerActive =>
                defmt::write!(fmt, "Sampler already running"),
            Self::InvalidConfig { field, reason } =>
                defmt::write!(fmt, "Config {}: {}", field, reason),
            Self::ConfigLoad { reason } =>
                defmt::write!(fmt, "Config load: {}", reason),
        }
    }
}
