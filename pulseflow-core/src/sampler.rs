//! Sampler: the periodic pulse-to-volume conversion step
//!
//! ## Cycle
//!
//! Once per gate interval the Sampler, and only the Sampler, turns the
//! counter's pulses into a new [`FlowState`]:
//!
//! ```text
//! 1. raw_count        = EdgeCounter.drain()
//! 2. frequency_hz     = raw_count / gate_seconds
//! 3. effective_ppl    = pulses_per_liter * trim_factor
//! 4. volume_increment = raw_count / effective_ppl      (0 if ppl <= 0)
//! 5. instantaneous    = volume_increment * 60 / gate_seconds
//! 6. smoothed         = Smoother.update(instantaneous)
//! 7. instantaneous > noise threshold:
//!        total_volume += volume_increment, refresh activity
//! 8. publish Snapshot to the Shared State Store
//! ```
//!
//! Volume is always integrated from the *unsmoothed* count of the cycle;
//! the smoothed rate is for display only and is never converted back into
//! liters.
//!
//! After the drain the Sampler also runs the second tier of overflow
//! handling: if the guard's window count reached its maximum, the counter
//! peripheral is reinitialized here, outside interrupt context.
//!
//! A [`FlowMeter::hard_reset`] from another context moves the meter's
//! epoch inside the store's write section. A cycle that started before the
//! reset finds its publish refused, keeps the zeroed snapshot and clears
//! its own accumulators.
//!
//! ## Failure Model
//!
//! Overflow and calibration faults degrade the cycle and are reported in
//! its [`CycleStatus`]. The only error a cycle returns is
//! [`FlowError::SynchronizationFailure`], which ends [`Sampler::run`].

use core::convert::Infallible;

use crate::activity::{ActivityChange, ActivityListener, ActivityMonitor};
use crate::config::Calibration;
use crate::constants::time::SECONDS_PER_MINUTE;
use crate::counter::CounterUnit;
use crate::errors::{FlowError, FlowResult};
use crate::meter::FlowMeter;
use crate::smoother::Smoother;
use crate::state::{CycleStatus, FlowState, Snapshot};
use crate::time::TimeSource;

/// Pulses drained in one gate interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseSample {
    pub raw_count: i32,
    pub gate_seconds: f32,
}

/// Units derived from one [`PulseSample`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub frequency_hz: f32,
    pub volume_increment_l: f32,
    pub instantaneous_lpm: f32,
    /// Calibration was unusable; volume and flow were forced to zero
    pub calibration_fault: bool,
}

impl PulseSample {
    /// Convert counts to frequency, volume and flow rate
    ///
    /// Negative counts (a counter nudged backwards by noise) carry no
    /// liquid and convert as zero pulses.
    pub fn convert(&self, calibration: &Calibration) -> Conversion {
        let pulses = self.raw_count.max(0) as f32;
        let frequency_hz = pulses / self.gate_seconds;

        if !calibration.is_usable() {
            return Conversion {
                frequency_hz,
                volume_increment_l: 0.0,
                instantaneous_lpm: 0.0,
                calibration_fault: true,
            };
        }

        let volume_increment_l = pulses / calibration.effective_ppl();
        Conversion {
            frequency_hz,
            volume_increment_l,
            instantaneous_lpm: volume_increment_l * (SECONDS_PER_MINUTE / self.gate_seconds),
            calibration_fault: false,
        }
    }
}

/// Shorthand for `PulseSample { raw_count, gate_seconds }.convert(calibration)`
pub fn convert(raw_count: i32, gate_seconds: f32, calibration: &Calibration) -> Conversion {
    PulseSample { raw_count, gate_seconds }.convert(calibration)
}

/// Outcome of one sampling cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// Snapshot as published, version included
    pub snapshot: Snapshot,
    pub status: CycleStatus,
    pub activity_change: Option<ActivityChange>,
}

/// Gate interval timer in the `nb` style
///
/// `wait()` returns `WouldBlock` until the current gate interval has
/// elapsed, then `Ok(())` once and re-arms for the next interval.
pub trait GateTimer {
    fn wait(&mut self) -> nb::Result<(), Infallible>;
}

/// The only writer of FlowState
pub struct Sampler<'m, U: CounterUnit, T: TimeSource> {
    meter: &'m FlowMeter<U>,
    clock: T,
    smoother: Smoother,
    activity: ActivityMonitor,
    total_volume_l: f64,
    epoch: u32,
    calibration_fault_reported: bool,
    listener: Option<&'m dyn ActivityListener>,
}

impl<'m, U: CounterUnit, T: TimeSource> Sampler<'m, U, T> {
    /// Continue from whatever the store currently holds
    pub(crate) fn resume(meter: &'m FlowMeter<U>, clock: T) -> FlowResult<Self> {
        let config = meter.config();
        // Epoch first: a reset landing between the two is followed next cycle
        let epoch = meter.epoch();
        let current = meter.store().read()?;

        Ok(Self {
            meter,
            clock,
            smoother: Smoother::new(config.smoothing.clone()),
            activity: ActivityMonitor::new(config.tuning.idle_timeout_ms)
                .restore(current.activity),
            total_volume_l: current.flow.total_volume_l,
            epoch,
            calibration_fault_reported: false,
            listener: None,
        })
    }

    /// Notify `listener` of every activity transition
    pub fn with_listener(mut self, listener: &'m dyn ActivityListener) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Run one sampling cycle and publish its snapshot
    pub fn cycle(&mut self) -> FlowResult<CycleReport> {
        self.follow_hard_reset();

        let meter = self.meter;
        let config = meter.config();
        let tuning = &config.tuning;
        let calibration = &config.calibration;
        let mut status = CycleStatus::default();

        let raw_count = meter.counter().drain();
        status.overflow = meter.guard().take_overflow();

        if let Some(count) = meter.guard().try_recover(tuning.overflow_max_count) {
            meter.counter().reinitialize();
            meter.record_reinitialization();
            status.persistent_overflow = true;
            log_warn!(
                "{}",
                FlowError::PersistentOverflow { count, max: tuning.overflow_max_count }
            );
        }

        let now = self.clock.now();
        let conversion = convert(raw_count, tuning.gate_seconds, calibration);

        if conversion.calibration_fault {
            status.calibration_fault = true;
            meter.record_calibration_fault();
            if !self.calibration_fault_reported {
                log_warn!("{}", FlowError::Calibration { effective_ppl: calibration.effective_ppl() });
                self.calibration_fault_reported = true;
            }
        }

        let smoothed = self.smoother.update(conversion.instantaneous_lpm);

        let qualifying = conversion.instantaneous_lpm > tuning.noise_threshold_lpm;
        if qualifying {
            self.total_volume_l += conversion.volume_increment_l as f64;
        }
        let activity_change = self.activity.observe(qualifying, now);

        let snapshot = Snapshot {
            flow: FlowState {
                frequency_hz: conversion.frequency_hz,
                flow_rate_lpm: smoothed,
                instantaneous_lpm: conversion.instantaneous_lpm,
                total_volume_l: self.total_volume_l,
                raw_count,
                overflow_flag: status.any_overflow(),
                status,
                timestamp: now,
            },
            activity: self.activity.state(),
            version: 0,
            calibration_ppl: calibration.effective_ppl(),
        };

        let published = match meter.publish(snapshot, self.epoch)? {
            Some(published) => published,
            None => {
                // Hard reset landed mid-cycle; its zeroed snapshot stands
                log_debug!("cycle dropped: hard reset during cycle");
                self.follow_hard_reset();
                return Ok(CycleReport {
                    snapshot: meter.read()?,
                    status,
                    activity_change: None,
                });
            }
        };

        log_trace!(
            "cycle v{}: {} pulses, {} Hz, {} L/min (smoothed {}), total {} L",
            published.version,
            raw_count,
            conversion.frequency_hz,
            conversion.instantaneous_lpm,
            smoothed,
            self.total_volume_l
        );

        if let Some(change) = activity_change {
            log_debug!("activity change: {:?}", change);
            if let Some(listener) = self.listener {
                listener.on_activity_change(change);
            }
        }

        Ok(CycleReport {
            snapshot: published,
            status,
            activity_change,
        })
    }

    /// Cycle on every gate tick until a fatal error
    ///
    /// Never returns under normal operation; the returned error is the one
    /// that stopped the loop and calls for a process restart.
    pub fn run<G: GateTimer>(&mut self, timer: &mut G) -> FlowError {
        log_info!(
            "sampler started: gate {} s, {} pulses/L",
            self.meter.config().tuning.gate_seconds,
            self.meter.config().calibration.effective_ppl()
        );

        loop {
            match nb::block!(timer.wait()) {
                Ok(()) => {}
                Err(never) => match never {},
            }

            if let Err(err) = self.cycle() {
                log_error!("sampler stopped: {}", err);
                return err;
            }
        }
    }

    /// Cumulative volume as tracked by this sampler
    pub fn total_volume_l(&self) -> f64 {
        self.total_volume_l
    }

    pub fn smoother(&self) -> &Smoother {
        &self.smoother
    }

    pub fn activity(&self) -> &ActivityMonitor {
        &self.activity
    }

    fn follow_hard_reset(&mut self) {
        let epoch = self.meter.epoch();
        if epoch != self.epoch {
            self.epoch = epoch;
            self.total_volume_l = 0.0;
            self.smoother.reset();
            self.activity.reset();
            self.calibration_fault_reported = false;
            log_info!("sampler state cleared after hard reset");
        }
    }
}

impl<U: CounterUnit, T: TimeSource> Drop for Sampler<'_, U, T> {
    fn drop(&mut self) {
        self.meter.release_sampler();
    }
}
