//! Hosted runtime: the Sampler on its own thread (requires std)
//!
//! On a microcontroller the board crate drives [`Sampler::run`] from a
//! hardware timer. On a hosted OS this module gives the Sampler a
//! dedicated named thread and a fixed-rate [`IntervalTimer`], while the
//! reporting side keeps an `Arc<FlowMeter>` and reads on its own schedule.
//!
//! [`Sampler::run`]: crate::sampler::Sampler::run

use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::activity::ActivityListener;
use crate::counter::CounterUnit;
use crate::errors::FlowError;
use crate::meter::FlowMeter;
use crate::sampler::GateTimer;
use crate::time::TimeSource;

/// Thread name of the sampling thread
pub const SAMPLER_THREAD_NAME: &str = "flow-sampler";

/// Fixed-rate gate timer backed by `Instant`
///
/// Deadlines advance by exactly one period each tick, so a late cycle does
/// not shift the ones after it.
#[derive(Debug)]
pub struct IntervalTimer {
    period: Duration,
    deadline: Instant,
}

impl IntervalTimer {
    /// First tick one period from now
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: Instant::now() + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl GateTimer for IntervalTimer {
    fn wait(&mut self) -> nb::Result<(), Infallible> {
        let now = Instant::now();
        if now >= self.deadline {
            self.deadline += self.period;
            // More than a whole period behind: skip the missed ticks
            if self.deadline <= now {
                self.deadline = now + self.period;
            }
            return Ok(());
        }

        thread::sleep(self.deadline - now);
        Err(nb::Error::WouldBlock)
    }
}

/// Handle to the running sampling thread
#[derive(Debug)]
pub struct SamplerHandle {
    thread: JoinHandle<FlowError>,
}

impl SamplerHandle {
    /// Wait for the sampler to stop
    ///
    /// `Ok` carries the error that ended the loop; `Err` carries the panic
    /// payload if the thread panicked, for example inside a listener.
    pub fn join(self) -> thread::Result<FlowError> {
        self.thread.join()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

/// Start the Sampler for `meter` on a dedicated thread
pub fn spawn_sampler<U, T>(
    meter: Arc<FlowMeter<U>>,
    clock: T,
    listener: Option<Arc<dyn ActivityListener + Send>>,
) -> io::Result<SamplerHandle>
where
    U: CounterUnit + Send + 'static,
    T: TimeSource + 'static,
{
    let period = Duration::from_millis(meter.config().tuning.gate_period_ms());

    let thread = thread::Builder::new()
        .name(SAMPLER_THREAD_NAME.into())
        .spawn(move || {
            let mut sampler = match meter.sampler(clock) {
                Ok(sampler) => sampler,
                Err(err) => {
                    log_error!("sampler could not start: {}", err);
                    return err;
                }
            };
            if let Some(listener) = listener.as_deref() {
                sampler = sampler.with_listener(listener);
            }

            let mut timer = IntervalTimer::new(period);
            sampler.run(&mut timer)
        })?;

    Ok(SamplerHandle { thread })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityChange;
    use crate::config::FlowConfig;
    use crate::counter::SimulatedCounter;
    use crate::time::{MockTimeSource, MonotonicClock};

    struct PanickingListener;

    impl ActivityListener for PanickingListener {
        fn on_activity_change(&self, _change: ActivityChange) {
            panic!("listener failed");
        }
    }

    fn fast_meter() -> Arc<FlowMeter<SimulatedCounter>> {
        let config = FlowConfig::builder().gate_seconds(0.01).build().unwrap();
        Arc::new(FlowMeter::new(config, SimulatedCounter::new(30_000)).unwrap())
    }

    #[test]
    fn join_reports_start_failure() {
        let meter = fast_meter();
        let _running = meter.sampler(MockTimeSource::new(0)).unwrap();

        let handle = spawn_sampler(Arc::clone(&meter), MonotonicClock::new(), None).unwrap();

        assert_eq!(handle.join().unwrap(), FlowError::SamplerActive);
    }

    #[test]
    fn join_surfaces_a_panicked_thread() {
        let meter = fast_meter();
        let handle = spawn_sampler(
            Arc::clone(&meter),
            MonotonicClock::new(),
            Some(Arc::new(PanickingListener)),
        )
        .unwrap();

        meter.counter().unit().feed(100, meter.guard());

        assert!(handle.join().is_err());
    }

    #[test]
    fn interval_timer_ticks_after_period() {
        let mut timer = IntervalTimer::new(Duration::from_millis(5));
        let start = Instant::now();

        nb::block!(timer.wait()).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn interval_timer_skips_missed_ticks() {
        let mut timer = IntervalTimer::new(Duration::from_millis(50));
        thread::sleep(Duration::from_millis(120));

        // One immediate tick, then back on schedule instead of a burst
        assert!(timer.wait().is_ok());
        assert!(timer.wait().is_err());
    }
}
