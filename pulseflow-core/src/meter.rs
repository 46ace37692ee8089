//! Flow meter: owned bundle of the measurement core
//!
//! A [`FlowMeter`] owns the Edge Counter, the Overflow Guard, the Shared
//! State Store and the startup configuration. It replaces module-level
//! mutable state: every context gets at the core through a reference to
//! this one object.
//!
//! ```text
//!  interrupt context        sampler context            reporting context
//!  ─────────────────        ───────────────            ─────────────────
//!  meter.on_high_water()    meter.sampler(clock)       meter.report()
//!    └─ guard atomics         └─ Sampler::cycle()      meter.is_active()
//!                                 └─ store.write()       └─ store.read()
//! ```
//!
//! ```rust
//! use pulseflow_core::{FlowMeter, config::FlowConfig};
//! use pulseflow_core::counter::SimulatedCounter;
//! use pulseflow_core::time::MockTimeSource;
//!
//! let meter = FlowMeter::new(FlowConfig::default(), SimulatedCounter::new(30_000))?;
//! let clock = MockTimeSource::new(0);
//! let mut sampler = meter.sampler(&clock)?;
//!
//! meter.counter().unit().feed(1319, meter.guard());
//! clock.advance(1000);
//! sampler.cycle()?;
//!
//! let report = meter.report()?;
//! assert!(report.total_volume_l > 0.99);
//! assert!(meter.is_active()?);
//! # Ok::<(), pulseflow_core::FlowError>(())
//! ```

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::FlowConfig;
use crate::counter::{CounterUnit, EdgeCounter};
use crate::errors::{FlowError, FlowResult};
use crate::overflow::OverflowGuard;
use crate::sampler::Sampler;
use crate::state::{Diagnostics, ReportSnapshot, Snapshot};
use crate::store::SharedStateStore;
use crate::time::TimeSource;

/// The measurement core for one sensor
#[derive(Debug)]
pub struct FlowMeter<U: CounterUnit> {
    config: FlowConfig,
    counter: EdgeCounter<U>,
    guard: OverflowGuard,
    store: SharedStateStore,
    /// Bumped by every hard reset, inside the store's write section
    epoch: AtomicU32,
    sampler_claimed: AtomicBool,
    cycles: AtomicU32,
    reinitializations: AtomicU32,
    calibration_faults: AtomicU32,
}

impl<U: CounterUnit> FlowMeter<U> {
    /// Validate `config` and wrap `unit`; all state starts zeroed
    ///
    /// The unit is programmed with the configured high-water mark, and
    /// drains are clamped to it.
    pub fn new(config: FlowConfig, unit: U) -> FlowResult<Self> {
        config.validate()?;
        let initial = Snapshot::initial(config.calibration.effective_ppl());
        let high_water = config.tuning.overflow_high_water;

        if unit.high_water() != high_water {
            log_debug!(
                "counter high-water {} reprogrammed to {}",
                unit.high_water(),
                high_water
            );
            unit.set_high_water(high_water);
        }

        log_info!(
            "flow meter ready: {} pulses/L (trim {}), gate {} s, high-water {}",
            config.calibration.pulses_per_liter,
            config.calibration.trim_factor,
            config.tuning.gate_seconds,
            config.tuning.overflow_high_water
        );

        Ok(Self {
            config,
            counter: EdgeCounter::new(unit).with_range(high_water),
            guard: OverflowGuard::new(),
            store: SharedStateStore::new(initial),
            epoch: AtomicU32::new(0),
            sampler_claimed: AtomicBool::new(false),
            cycles: AtomicU32::new(0),
            reinitializations: AtomicU32::new(0),
            calibration_faults: AtomicU32::new(0),
        })
    }

    /// The Sampler for this meter
    ///
    /// Only one Sampler may exist per meter at a time; further calls fail
    /// with [`FlowError::SamplerActive`] until it is dropped. It resumes
    /// from the stored snapshot.
    pub fn sampler<T: TimeSource>(&self, clock: T) -> FlowResult<Sampler<'_, U, T>> {
        if self.sampler_claimed.swap(true, Ordering::AcqRel) {
            return Err(FlowError::SamplerActive);
        }
        Sampler::resume(self, clock).map_err(|err| {
            self.release_sampler();
            err
        })
    }

    /// High-water interrupt entry point
    ///
    /// Safe to call from interrupt context: atomics only.
    pub fn on_high_water(&self) {
        self.guard.on_high_water(self.counter.unit());
    }

    /// Latest full snapshot
    pub fn read(&self) -> FlowResult<Snapshot> {
        self.store.read()
    }

    /// Latest snapshot in the reporting layer's shape
    pub fn report(&self) -> FlowResult<ReportSnapshot> {
        self.store.read().map(|snapshot| snapshot.report())
    }

    /// Whether the Activity Monitor last reported flow
    pub fn is_active(&self) -> FlowResult<bool> {
        self.store.read().map(|snapshot| snapshot.activity.is_active())
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            cycles: self.cycles.load(Ordering::Relaxed) as u64,
            overflow_events: self.guard.overflow_events(),
            pending_overflows: self.guard.pending(),
            dropped_pulses: self.guard.dropped_pulses(),
            reinitializations: self.reinitializations.load(Ordering::Relaxed),
            calibration_faults: self.calibration_faults.load(Ordering::Relaxed),
        }
    }

    /// Reinitialize the counter and zero FlowState and ActivityState
    ///
    /// The epoch moves inside the same write section that stores the
    /// zeroed snapshot, so a Sampler cycle already in flight cannot
    /// publish pre-reset volume afterwards. The Sampler drops that cycle
    /// and restarts its accumulators from zero.
    pub fn hard_reset(&self) -> FlowResult<()> {
        self.counter.reinitialize();
        self.guard.reset();
        self.store.write_if(
            Snapshot::initial(self.config.calibration.effective_ppl()),
            || {
                self.epoch.fetch_add(1, Ordering::AcqRel);
                true
            },
        )?;
        log_warn!("hard reset: counter reinitialized, volume cleared");
        Ok(())
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn counter(&self) -> &EdgeCounter<U> {
        &self.counter
    }

    pub fn guard(&self) -> &OverflowGuard {
        &self.guard
    }

    pub fn store(&self) -> &SharedStateStore {
        &self.store
    }

    pub(crate) fn epoch(&self) -> u32 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Store a Sampler snapshot unless a hard reset moved past `epoch`
    pub(crate) fn publish(&self, snapshot: Snapshot, epoch: u32) -> FlowResult<Option<Snapshot>> {
        let published = self
            .store
            .write_if(snapshot, || self.epoch.load(Ordering::Acquire) == epoch)?;
        if published.is_some() {
            self.cycles.fetch_add(1, Ordering::Relaxed);
        }
        Ok(published)
    }

    pub(crate) fn release_sampler(&self) {
        self.sampler_claimed.store(false, Ordering::Release);
    }

    pub(crate) fn record_reinitialization(&self) {
        self.reinitializations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_calibration_fault(&self) {
        self.calibration_faults.fetch_add(1, Ordering::Relaxed);
    }
}
