//! Startup configuration
//!
//! The core consumes one [`FlowConfig`] at startup and treats it as
//! immutable for the process lifetime. It bundles:
//!
//! - [`Calibration`]: pulses per liter and trim factor
//! - [`Tuning`]: gate interval, noise threshold, idle timeout and the
//!   overflow policy
//! - [`AlphaPolicy`]: the smoothing table
//!
//! ```rust
//! use pulseflow_core::config::FlowConfig;
//!
//! let config = FlowConfig::builder()
//!     .pulses_per_liter(1319.0)
//!     .trim_factor(1.02)
//!     .gate_seconds(1.0)
//!     .idle_timeout_ms(300_000)
//!     .build()?;
//!
//! assert!(config.calibration.is_usable());
//! # Ok::<(), pulseflow_core::FlowError>(())
//! ```
//!
//! A calibration whose effective pulses-per-liter is not positive is *not*
//! rejected here: the Sampler degrades to zero flow and reports the fault
//! in every snapshot until the configuration is corrected.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::counter::{
    COUNTER_HW_LIMIT, DEFAULT_OVERFLOW_HIGH_WATER, DEFAULT_OVERFLOW_MAX_COUNT,
};
use crate::constants::flow::{
    DEFAULT_NOISE_THRESHOLD_LPM, DEFAULT_PULSES_PER_LITER, DEFAULT_TRIM_FACTOR,
    TRIM_TYPICAL_DEVIATION,
};
use crate::constants::time::{
    DEFAULT_GATE_SECONDS, DEFAULT_IDLE_TIMEOUT_MS, MAX_GATE_SECONDS, MIN_GATE_SECONDS,
    MS_PER_SECOND,
};
use crate::errors::{FlowError, FlowResult};
use crate::smoother::AlphaPolicy;

/// Sensor calibration
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Calibration {
    /// Pulses the sensor emits per liter
    pub pulses_per_liter: f32,
    /// Multiplicative correction, nominal 1.0
    pub trim_factor: f32,
}

impl Calibration {
    pub const fn new(pulses_per_liter: f32, trim_factor: f32) -> Self {
        Self { pulses_per_liter, trim_factor }
    }

    /// `pulses_per_liter * trim_factor`
    pub fn effective_ppl(&self) -> f32 {
        self.pulses_per_liter * self.trim_factor
    }

    /// Whether conversion can use this calibration
    pub fn is_usable(&self) -> bool {
        let ppl = self.effective_ppl();
        ppl.is_finite() && ppl > 0.0
    }

    /// Error describing why the calibration is unusable, if it is
    pub fn check(&self) -> FlowResult<()> {
        if self.is_usable() {
            Ok(())
        } else {
            Err(FlowError::Calibration { effective_ppl: self.effective_ppl() })
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(DEFAULT_PULSES_PER_LITER, DEFAULT_TRIM_FACTOR)
    }
}

/// Sampling and overflow tuning constants
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Tuning {
    /// Fixed sampling period in seconds
    pub gate_seconds: f32,
    /// Instantaneous flow at or below this is jitter (L/min)
    pub noise_threshold_lpm: f32,
    /// Time without qualifying flow before the meter goes idle
    pub idle_timeout_ms: u64,
    /// Count at which the overflow interrupt fires
    pub overflow_high_water: i32,
    /// Overflows tolerated before a full counter reinitialization
    pub overflow_max_count: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gate_seconds: DEFAULT_GATE_SECONDS,
            noise_threshold_lpm: DEFAULT_NOISE_THRESHOLD_LPM,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            overflow_high_water: DEFAULT_OVERFLOW_HIGH_WATER,
            overflow_max_count: DEFAULT_OVERFLOW_MAX_COUNT,
        }
    }
}

impl Tuning {
    /// Gate interval in whole milliseconds
    pub fn gate_period_ms(&self) -> u64 {
        libm::roundf(self.gate_seconds * MS_PER_SECOND as f32) as u64
    }

    pub fn validate(&self) -> FlowResult<()> {
        if !(MIN_GATE_SECONDS..=MAX_GATE_SECONDS).contains(&self.gate_seconds) {
            return Err(FlowError::InvalidConfig {
                field: "gate_seconds",
                reason: "must be between 0.01 and 60 seconds",
            });
        }

        if !(self.noise_threshold_lpm.is_finite() && self.noise_threshold_lpm >= 0.0) {
            return Err(FlowError::InvalidConfig {
                field: "noise_threshold_lpm",
                reason: "must be a non-negative number",
            });
        }

        if self.idle_timeout_ms == 0 {
            return Err(FlowError::InvalidConfig {
                field: "idle_timeout_ms",
                reason: "must be positive",
            });
        }

        if self.overflow_high_water <= 0 || self.overflow_high_water > COUNTER_HW_LIMIT {
            return Err(FlowError::InvalidConfig {
                field: "overflow_high_water",
                reason: "must be within the hardware counter range",
            });
        }

        if self.overflow_max_count == 0 {
            return Err(FlowError::InvalidConfig {
                field: "overflow_max_count",
                reason: "must be at least 1",
            });
        }

        Ok(())
    }
}

/// Everything the core needs at startup
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FlowConfig {
    pub calibration: Calibration,
    pub tuning: Tuning,
    pub smoothing: AlphaPolicy,
}

impl FlowConfig {
    pub fn builder() -> FlowConfigBuilder {
        FlowConfigBuilder::new()
    }

    /// Validate tuning and smoothing; calibration faults are only logged
    pub fn validate(&self) -> FlowResult<()> {
        self.tuning.validate()?;
        self.smoothing.validate()?;

        if !self.calibration.is_usable() {
            log_warn!(
                "effective pulses per liter {} unusable, flow will read zero",
                self.calibration.effective_ppl()
            );
        } else if libm::fabsf(self.calibration.trim_factor - 1.0) > TRIM_TYPICAL_DEVIATION {
            log_warn!(
                "trim factor {} outside the typical ±5% range",
                self.calibration.trim_factor
            );
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration document
    ///
    /// Missing fields take their defaults.
    #[cfg(feature = "std")]
    pub fn from_json_str(json: &str) -> FlowResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| {
            log_error!("failed to parse flow configuration: {}", err);
            FlowError::ConfigLoad { reason: "malformed JSON configuration" }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    #[cfg(feature = "std")]
    pub fn from_path<P: AsRef<std::path::Path>>(path: P) -> FlowResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            log_error!("failed to read {}: {}", path.display(), err);
            FlowError::ConfigLoad { reason: "configuration file unreadable" }
        })?;
        Self::from_json_str(&json)
    }
}

/// Builder for [`FlowConfig`]
#[derive(Debug, Clone, Default)]
pub struct FlowConfigBuilder {
    config: FlowConfig,
}

impl FlowConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calibration(mut self, calibration: Calibration) -> Self {
        self.config.calibration = calibration;
        self
    }

    pub fn pulses_per_liter(mut self, ppl: f32) -> Self {
        self.config.calibration.pulses_per_liter = ppl;
        self
    }

    pub fn trim_factor(mut self, trim: f32) -> Self {
        self.config.calibration.trim_factor = trim;
        self
    }

    pub fn gate_seconds(mut self, seconds: f32) -> Self {
        self.config.tuning.gate_seconds = seconds;
        self
    }

    pub fn noise_threshold_lpm(mut self, lpm: f32) -> Self {
        self.config.tuning.noise_threshold_lpm = lpm;
        self
    }

    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.tuning.idle_timeout_ms = ms;
        self
    }

    pub fn overflow_high_water(mut self, counts: i32) -> Self {
        self.config.tuning.overflow_high_water = counts;
        self
    }

    pub fn overflow_max_count(mut self, count: u32) -> Self {
        self.config.tuning.overflow_max_count = count;
        self
    }

    pub fn smoothing(mut self, policy: AlphaPolicy) -> Self {
        self.config.smoothing = policy;
        self
    }

    pub fn build(self) -> FlowResult<FlowConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
