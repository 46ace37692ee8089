//! Cross-context behaviour: concurrent readers, interrupt path, hosted runtime

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use common::assert_close_f64;
use pulseflow_core::{
    config::FlowConfig,
    counter::SimulatedCounter,
    runtime::{spawn_sampler, SAMPLER_THREAD_NAME},
    time::MonotonicClock,
    ActivityChange, ActivityListener, FlowMeter, SharedStateStore, Snapshot,
};

/// Every field derived from one number, so a torn read is detectable
fn stamped(n: u32) -> Snapshot {
    let mut snapshot = Snapshot::initial(1319.0);
    snapshot.flow.raw_count = n as i32;
    snapshot.flow.frequency_hz = n as f32;
    snapshot.flow.total_volume_l = n as f64;
    snapshot.flow.timestamp = n as u64;
    snapshot.activity.last_active_timestamp = n as u64;
    snapshot
}

#[test]
fn readers_never_observe_a_mixed_snapshot() {
    const WRITES: u32 = 20_000;
    let store = Arc::new(SharedStateStore::new(Snapshot::initial(1319.0)));
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut last_version = 0;
                while !done.load(Ordering::Acquire) {
                    let snapshot = store.read().unwrap();
                    let n = snapshot.flow.raw_count;

                    assert_eq!(snapshot.flow.frequency_hz, n as f32);
                    assert_eq!(snapshot.flow.total_volume_l, n as f64);
                    assert_eq!(snapshot.flow.timestamp, n as u64);
                    assert_eq!(snapshot.activity.last_active_timestamp, n as u64);
                    // Writer stamps n equal to the version it will receive
                    assert_eq!(snapshot.version, n as u64);
                    assert!(snapshot.version >= last_version);
                    last_version = snapshot.version;
                }
            })
        })
        .collect();

    for n in 1..=WRITES {
        store.write(stamped(n)).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.version().unwrap(), WRITES as u64);
}

#[test]
fn interrupt_path_runs_alongside_the_sampler() {
    // Count every pulse and never reinitialize mid-test
    let config = FlowConfig::builder()
        .overflow_high_water(500)
        .overflow_max_count(u32::MAX)
        .noise_threshold_lpm(0.0)
        .build()
        .unwrap();
    let meter = FlowMeter::new(config, SimulatedCounter::new(500)).unwrap();
    let clock = pulseflow_core::time::MockTimeSource::new(0);

    thread::scope(|scope| {
        let meter = &meter;
        scope.spawn(move || {
            for _ in 0..2_000 {
                meter.counter().unit().feed(37, meter.guard());
            }
        });

        let mut sampler = meter.sampler(&clock).unwrap();
        for _ in 0..200 {
            clock.advance(1_000);
            sampler.cycle().unwrap();
        }
    });

    // Whatever was not dropped by an overflow clear is still counted
    let mut sampler = meter.sampler(&clock).unwrap();
    clock.advance(1_000);
    sampler.cycle().unwrap();

    let diagnostics = meter.diagnostics();
    let counted = meter.report().unwrap().total_volume_l * 1319.0;
    let fed = 2_000.0 * 37.0;
    assert!(diagnostics.overflow_events > 0);
    assert_close_f64(counted + diagnostics.dropped_pulses as f64, fed, 1.0);
}

#[derive(Default)]
struct Recorder {
    changes: Mutex<Vec<ActivityChange>>,
}

impl ActivityListener for Recorder {
    fn on_activity_change(&self, change: ActivityChange) {
        self.changes.lock().unwrap().push(change);
    }
}

#[test]
fn spawned_sampler_publishes_on_its_own_thread() {
    let config = FlowConfig::builder().gate_seconds(0.02).build().unwrap();
    let meter = Arc::new(FlowMeter::new(config, SimulatedCounter::new(30_000)).unwrap());
    let recorder = Arc::new(Recorder::default());

    let handle = spawn_sampler(
        Arc::clone(&meter),
        MonotonicClock::new(),
        Some(recorder.clone() as Arc<dyn ActivityListener + Send>),
    )
    .unwrap();

    meter.counter().unit().feed(1319, meter.guard());

    let mut report = meter.report().unwrap();
    for _ in 0..100 {
        thread::sleep(Duration::from_millis(20));
        report = meter.report().unwrap();
        if report.total_volume_l > 0.999 {
            break;
        }
    }

    assert_close_f64(report.total_volume_l, 1.0, 1e-4);
    assert!(report.version > 0);
    assert!(meter.is_active().unwrap());
    assert!(!handle.is_finished());
    assert!(recorder
        .changes
        .lock()
        .unwrap()
        .first()
        .map_or(false, ActivityChange::is_active));
    assert_eq!(SAMPLER_THREAD_NAME, "flow-sampler");
}
