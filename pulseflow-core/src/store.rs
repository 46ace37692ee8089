//! Shared State Store
//!
//! The single synchronization point between the Sampler (one writer) and
//! every reader: reporting, power management, diagnostics.
//!
//! ## Locking Discipline
//!
//! - Writes replace the whole [`Snapshot`]; reads copy the whole snapshot.
//!   A reader that sees version N sees *only* version N fields.
//! - Both critical sections are a plain struct copy: bounded, no blocking
//!   calls, no allocation while the lock is held.
//! - Acquisition spins for at most `spin_limit` attempts. Running out
//!   means the holder is gone, which the core treats as fatal
//!   ([`FlowError::SynchronizationFailure`]).
//! - The overflow interrupt never comes here; it only touches the
//!   guard's atomics.

use spin::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::constants::time::LOCK_SPIN_LIMIT;
use crate::errors::{FlowError, FlowResult};
use crate::state::Snapshot;

/// Owned, lock-protected snapshot cell
#[derive(Debug)]
pub struct SharedStateStore {
    cell: RwLock<Snapshot>,
    spin_limit: u32,
}

impl SharedStateStore {
    pub const fn new(initial: Snapshot) -> Self {
        Self {
            cell: RwLock::new(initial),
            spin_limit: LOCK_SPIN_LIMIT,
        }
    }

    /// Override the acquisition budget
    pub fn with_spin_limit(mut self, spin_limit: u32) -> Self {
        self.spin_limit = spin_limit.max(1);
        self
    }

    /// Publish a snapshot, assigning it the next version
    ///
    /// Returns the snapshot as stored.
    pub fn write(&self, snapshot: Snapshot) -> FlowResult<Snapshot> {
        let mut current = self.acquire_write()?;
        Ok(Self::replace(&mut current, snapshot))
    }

    /// Publish only if `admit` still holds inside the write section
    ///
    /// `admit` runs with the write lock held and must be as short as the
    /// copy itself. Returns `None` when the write was refused.
    pub fn write_if<F>(&self, snapshot: Snapshot, admit: F) -> FlowResult<Option<Snapshot>>
    where
        F: FnOnce() -> bool,
    {
        let mut current = self.acquire_write()?;
        if !admit() {
            return Ok(None);
        }
        Ok(Some(Self::replace(&mut current, snapshot)))
    }

    /// Copy of the latest snapshot
    pub fn read(&self) -> FlowResult<Snapshot> {
        let current = self.acquire_read()?;
        Ok(*current)
    }

    /// Version of the latest snapshot
    pub fn version(&self) -> FlowResult<u64> {
        Ok(self.acquire_read()?.version)
    }

    fn replace(current: &mut Snapshot, mut snapshot: Snapshot) -> Snapshot {
        snapshot.version = current.version.wrapping_add(1);
        *current = snapshot;
        snapshot
    }

    #[cfg(test)]
    pub(crate) fn hold_write(&self) -> RwLockWriteGuard<'_, Snapshot> {
        self.cell.write()
    }

    fn acquire_write(&self) -> FlowResult<RwLockWriteGuard<'_, Snapshot>> {
        for _ in 0..self.spin_limit {
            if let Some(guard) = self.cell.try_write() {
                return Ok(guard);
            }
            relax();
        }
        log_error!("state store write lock unavailable after {} attempts", self.spin_limit);
        Err(FlowError::SynchronizationFailure)
    }

    fn acquire_read(&self) -> FlowResult<RwLockReadGuard<'_, Snapshot>> {
        for _ in 0..self.spin_limit {
            if let Some(guard) = self.cell.try_read() {
                return Ok(guard);
            }
            relax();
        }
        log_error!("state store read lock unavailable after {} attempts", self.spin_limit);
        Err(FlowError::SynchronizationFailure)
    }
}

// A preempted holder on a hosted OS needs the core back to finish its copy
#[cfg(feature = "std")]
fn relax() {
    std::thread::yield_now();
}

#[cfg(not(feature = "std"))]
fn relax() {
    core::hint::spin_loop();
}
