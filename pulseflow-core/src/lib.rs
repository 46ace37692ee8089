//! Real-time measurement core for pulse-output flow meters
//!
//! Turns sensor edges into a smoothed flow rate, a frequency and a
//! cumulative volume, and hands them to a reporting layer that runs on its
//! own schedule. Designed for microcontrollers.
//!
//! Key constraints:
//! - The overflow interrupt touches atomics only
//! - No heap allocation on the sampling path
//! - Readers only ever see whole snapshots
//!
//! ```no_run
//! use std::sync::Arc;
//! use pulseflow_core::{FlowMeter, config::FlowConfig};
//! use pulseflow_core::counter::SimulatedCounter;
//! use pulseflow_core::runtime::spawn_sampler;
//! use pulseflow_core::time::MonotonicClock;
//!
//! let config = FlowConfig::builder().pulses_per_liter(450.0).build()?;
//! let meter = Arc::new(FlowMeter::new(config, SimulatedCounter::new(30_000))?);
//!
//! let handle = spawn_sampler(meter.clone(), MonotonicClock::new(), None)
//!     .expect("sampler thread");
//!
//! // Reporting side, any schedule
//! let report = meter.report()?;
//! println!("{}", report.rounded().to_json());
//! # drop(handle);
//! # Ok::<(), pulseflow_core::FlowError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod logging;

pub mod activity;
pub mod config;
pub mod constants;
pub mod counter;
pub mod errors;
pub mod meter;
pub mod overflow;
pub mod sampler;
pub mod smoother;
pub mod state;
pub mod store;
pub mod time;

#[cfg(feature = "std")]
pub mod runtime;

// Public API
pub use activity::{ActivityChange, ActivityListener, ActivityMonitor};
pub use config::{Calibration, FlowConfig, Tuning};
pub use counter::{CounterUnit, EdgeCounter, SimulatedCounter};
pub use errors::{FlowError, FlowResult};
pub use meter::FlowMeter;
pub use overflow::OverflowGuard;
pub use sampler::{convert, Conversion, CycleReport, GateTimer, PulseSample, Sampler};
pub use smoother::{AlphaBand, AlphaPolicy, Smoother};
pub use state::{
    ActivityMode, ActivityState, CycleStatus, Diagnostics, FlowState, ReportSnapshot, Snapshot,
};
pub use store::SharedStateStore;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
