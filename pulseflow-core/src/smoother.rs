//! Adaptive Exponential Moving Average for Flow Readings
//!
//! ## Overview
//!
//! Turbine sensors produce a noisy instantaneous rate: a single missed or
//! doubled edge at low flow moves the reading by several percent. A fixed
//! EMA either lags real transients (valve opening) or passes the jitter.
//! The smoother therefore picks its factor from the *current* instantaneous
//! magnitude:
//!
//! ```text
//! instantaneous (L/min)     alpha
//! ───────────────────────   ─────
//!   > 5.0                   0.50   fast tracking
//!   (1.0, 5.0]              0.35
//!   <= 1.0                  0.20   heavy damping
//! ```
//!
//! The table is data, not code: [`AlphaPolicy`] holds rows ordered from the
//! highest breakpoint down, and [`select_alpha`] is a pure lookup over them.
//!
//! ## Convexity
//!
//! For any alpha in [0, 1] the output is a convex combination of the
//! previous output and the new input, so it always lies between the two.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::flow::{
    ALPHA_HIGH_FLOW, ALPHA_LOW_FLOW, ALPHA_MEDIUM_FLOW, DEFAULT_ZERO_FLOOR_LPM, MAX_ALPHA_BANDS,
    SMOOTHING_HIGH_FLOW_LPM, SMOOTHING_MEDIUM_FLOW_LPM,
};
use crate::errors::{FlowError, FlowResult};

/// One row of the smoothing table
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlphaBand {
    /// Band applies when instantaneous flow is strictly above this value (L/min)
    pub above_lpm: f32,
    /// Smoothing factor for the band, in [0, 1]
    pub alpha: f32,
}

impl AlphaBand {
    pub const fn new(above_lpm: f32, alpha: f32) -> Self {
        Self { above_lpm, alpha }
    }
}

/// Table-driven choice of smoothing factor
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlphaPolicy {
    /// Rows sorted by `above_lpm`, highest first
    bands: Vec<AlphaBand, MAX_ALPHA_BANDS>,
    /// Factor used when no band matches
    floor_alpha: f32,
    /// Output snaps to zero below this once the input is zero (L/min)
    #[cfg_attr(feature = "serde", serde(default = "default_zero_floor"))]
    zero_floor_lpm: f32,
}

#[cfg(feature = "serde")]
fn default_zero_floor() -> f32 {
    DEFAULT_ZERO_FLOOR_LPM
}

impl Default for AlphaPolicy {
    fn default() -> Self {
        let mut bands = Vec::new();
        // Capacity is MAX_ALPHA_BANDS, two rows always fit
        let _ = bands.push(AlphaBand::new(SMOOTHING_HIGH_FLOW_LPM, ALPHA_HIGH_FLOW));
        let _ = bands.push(AlphaBand::new(SMOOTHING_MEDIUM_FLOW_LPM, ALPHA_MEDIUM_FLOW));

        Self {
            bands,
            floor_alpha: ALPHA_LOW_FLOW,
            zero_floor_lpm: DEFAULT_ZERO_FLOOR_LPM,
        }
    }
}

impl AlphaPolicy {
    /// Build a policy from rows in any order
    pub fn new(bands: &[AlphaBand], floor_alpha: f32) -> FlowResult<Self> {
        if bands.len() > MAX_ALPHA_BANDS {
            return Err(FlowError::InvalidConfig {
                field: "smoothing.bands",
                reason: "too many smoothing bands",
            });
        }

        let mut rows: Vec<AlphaBand, MAX_ALPHA_BANDS> = Vec::new();
        for band in bands {
            // Length checked above
            let _ = rows.push(*band);
        }
        rows.sort_unstable_by(|a, b| {
            b.above_lpm
                .partial_cmp(&a.above_lpm)
                .unwrap_or(core::cmp::Ordering::Equal)
        });

        let policy = Self {
            bands: rows,
            floor_alpha,
            zero_floor_lpm: DEFAULT_ZERO_FLOOR_LPM,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Override the zero-snap floor
    pub fn with_zero_floor(mut self, zero_floor_lpm: f32) -> Self {
        self.zero_floor_lpm = zero_floor_lpm;
        self
    }

    /// Check every factor lies in [0, 1] and every breakpoint is finite
    pub fn validate(&self) -> FlowResult<()> {
        if !alpha_in_range(self.floor_alpha) {
            return Err(FlowError::InvalidConfig {
                field: "smoothing.floor_alpha",
                reason: "alpha must be within [0, 1]",
            });
        }

        for band in &self.bands {
            if !alpha_in_range(band.alpha) {
                return Err(FlowError::InvalidConfig {
                    field: "smoothing.bands.alpha",
                    reason: "alpha must be within [0, 1]",
                });
            }
            if !band.above_lpm.is_finite() {
                return Err(FlowError::InvalidConfig {
                    field: "smoothing.bands.above_lpm",
                    reason: "breakpoint must be finite",
                });
            }
        }

        let descending = self
            .bands
            .windows(2)
            .all(|pair| pair[0].above_lpm >= pair[1].above_lpm);
        if !descending {
            return Err(FlowError::InvalidConfig {
                field: "smoothing.bands",
                reason: "breakpoints must be ordered highest first",
            });
        }

        if !(self.zero_floor_lpm >= 0.0 && self.zero_floor_lpm.is_finite()) {
            return Err(FlowError::InvalidConfig {
                field: "smoothing.zero_floor_lpm",
                reason: "must be a non-negative number",
            });
        }

        Ok(())
    }

    /// Smoothing factor for an instantaneous reading
    pub fn alpha_for(&self, instantaneous_lpm: f32) -> f32 {
        select_alpha(&self.bands, self.floor_alpha, instantaneous_lpm)
    }

    pub fn bands(&self) -> &[AlphaBand] {
        &self.bands
    }

    pub fn floor_alpha(&self) -> f32 {
        self.floor_alpha
    }

    pub fn zero_floor_lpm(&self) -> f32 {
        self.zero_floor_lpm
    }
}

fn alpha_in_range(alpha: f32) -> bool {
    (0.0..=1.0).contains(&alpha)
}

/// First band (highest breakpoint first) whose breakpoint the reading exceeds
pub fn select_alpha(bands: &[AlphaBand], floor_alpha: f32, instantaneous_lpm: f32) -> f32 {
    bands
        .iter()
        .find(|band| instantaneous_lpm > band.above_lpm)
        .map(|band| band.alpha)
        .unwrap_or(floor_alpha)
}

/// One EMA step: `alpha * input + (1 - alpha) * previous`
pub fn ema(alpha: f32, input: f32, previous: f32) -> f32 {
    alpha * input + (1.0 - alpha) * previous
}

/// Adaptive EMA over instantaneous flow
#[derive(Debug, Clone)]
pub struct Smoother {
    policy: AlphaPolicy,
    smoothed: f32,
}

impl Smoother {
    /// Starts from zero flow
    pub fn new(policy: AlphaPolicy) -> Self {
        Self { policy, smoothed: 0.0 }
    }

    /// Feed one instantaneous reading, return the new smoothed value
    pub fn update(&mut self, instantaneous_lpm: f32) -> f32 {
        let alpha = self.policy.alpha_for(instantaneous_lpm);
        let next = ema(alpha, instantaneous_lpm, self.smoothed);

        self.smoothed = if instantaneous_lpm == 0.0 && next < self.policy.zero_floor_lpm {
            0.0
        } else {
            next
        };
        self.smoothed
    }

    /// Last smoothed value
    pub fn value(&self) -> f32 {
        self.smoothed
    }

    pub fn policy(&self) -> &AlphaPolicy {
        &self.policy
    }

    pub fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(AlphaPolicy::default())
    }
}
