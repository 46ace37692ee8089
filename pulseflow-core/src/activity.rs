//! Activity Monitor
//!
//! Derives an active/idle signal from the flow history for the external
//! power manager. The monitor never sleeps or wakes anything itself.
//!
//! ```text
//!            qualifying flow
//!   ┌──────┐ ─────────────────→ ┌────────┐ ──┐ qualifying flow
//!   │ Idle │                    │ Active │   │ (refresh timestamp)
//!   └──────┘ ←───────────────── └────────┘ ←─┘
//!         now - last_active > idle_timeout
//! ```
//!
//! "Qualifying" means the cycle's instantaneous flow exceeded the noise
//! threshold. The idle check is a pure time comparison made on each
//! sampling cycle; nothing waits on it.

use crate::state::{ActivityMode, ActivityState};
use crate::time::{elapsed_ms, Timestamp};

/// A transition of the activity state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityChange {
    /// Flow resumed
    BecameActive { at: Timestamp },
    /// No qualifying flow for longer than the idle timeout
    BecameIdle { at: Timestamp, last_active: Timestamp },
}

impl ActivityChange {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::BecameActive { .. })
    }
}

/// Notified from the Sampler context after each transition is published
///
/// Implementations must return quickly and must not block: they run on
/// the real-time sampling path.
pub trait ActivityListener: Sync {
    fn on_activity_change(&self, change: ActivityChange);
}

/// Active/idle state machine
#[derive(Debug, Clone)]
pub struct ActivityMonitor {
    state: ActivityState,
    idle_timeout_ms: u64,
}

impl ActivityMonitor {
    /// Starts idle
    pub fn new(idle_timeout_ms: u64) -> Self {
        Self {
            state: ActivityState::default(),
            idle_timeout_ms,
        }
    }

    /// Resume from a previously published state
    pub fn restore(mut self, state: ActivityState) -> Self {
        self.state = state;
        self
    }

    /// Feed one sampling cycle
    pub fn observe(&mut self, qualifying: bool, now: Timestamp) -> Option<ActivityChange> {
        if qualifying {
            self.state.last_active_timestamp = now;
            if self.state.mode == ActivityMode::Idle {
                self.state.mode = ActivityMode::Active;
                return Some(ActivityChange::BecameActive { at: now });
            }
            return None;
        }

        if self.state.mode == ActivityMode::Active
            && elapsed_ms(self.state.last_active_timestamp, now) > self.idle_timeout_ms
        {
            self.state.mode = ActivityMode::Idle;
            return Some(ActivityChange::BecameIdle {
                at: now,
                last_active: self.state.last_active_timestamp,
            });
        }

        None
    }

    pub fn state(&self) -> ActivityState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn reset(&mut self) {
        self.state = ActivityState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle() {
        let monitor = ActivityMonitor::new(300_000);
        assert!(!monitor.is_active());
        assert_eq!(monitor.state().last_active_timestamp, 0);
    }

    #[test]
    fn qualifying_flow_activates_and_refreshes() {
        let mut monitor = ActivityMonitor::new(300_000);

        assert_eq!(
            monitor.observe(true, 1_000),
            Some(ActivityChange::BecameActive { at: 1_000 })
        );
        assert_eq!(monitor.observe(true, 2_000), None);
        assert_eq!(monitor.state().last_active_timestamp, 2_000);
    }

    #[test]
    fn goes_idle_only_after_timeout_elapses() {
        let mut monitor = ActivityMonitor::new(300_000);
        monitor.observe(true, 1_000);

        // Exactly at the timeout is not past it
        assert_eq!(monitor.observe(false, 301_000), None);
        assert!(monitor.is_active());

        assert_eq!(
            monitor.observe(false, 301_001),
            Some(ActivityChange::BecameIdle { at: 301_001, last_active: 1_000 })
        );
        assert!(!monitor.is_active());

        // Already idle, nothing more to report
        assert_eq!(monitor.observe(false, 900_000), None);
    }

    #[test]
    fn idle_without_history_stays_idle() {
        let mut monitor = ActivityMonitor::new(10);
        assert_eq!(monitor.observe(false, 1_000_000), None);
    }

    #[test]
    fn restore_resumes_state() {
        let state = ActivityState {
            mode: ActivityMode::Active,
            last_active_timestamp: 5_000,
        };
        let mut monitor = ActivityMonitor::new(1_000).restore(state);

        assert!(monitor.is_active());
        assert!(monitor.observe(false, 6_001).is_some());
    }
}
