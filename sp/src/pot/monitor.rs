//! The pot monitor: one mutex, one condition variable

use std::sync::{Arc, Condvar, LockResult, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use super::state::PotState;

/// A poisoned pot lock means a worker panicked mid-update; the state may be
/// torn, so the panic is propagated rather than recovered.
fn unpoison<T>(result: LockResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(poisoned) => panic!("pot lock poisoned: {}", poisoned),
    }
}

/// Mutex-guarded [`PotState`] plus the condition variable all workers wait on
///
/// Waiters must re-check their guard after every wake; wakes may be spurious
/// or stale.
#[derive(Debug)]
pub struct Monitor {
    state: Mutex<PotState>,
    cond: Condvar,
}

impl Monitor {
    pub fn new(state: PotState) -> Self {
        Self {
            state: Mutex::new(state),
            cond: Condvar::new(),
        }
    }

    /// Enter the critical section
    pub fn lock(&self) -> MutexGuard<'_, PotState> {
        unpoison(self.state.lock())
    }

    /// Release the lock, sleep until woken, re-acquire
    pub fn wait<'a>(&self, guard: MutexGuard<'a, PotState>) -> MutexGuard<'a, PotState> {
        unpoison(self.cond.wait(guard))
    }

    /// Wake every waiter
    pub fn broadcast(&self) {
        self.cond.notify_all();
    }

    /// Signal waiters if the last operation under `guard` asked for it
    pub fn wake_if_pending(&self, guard: &mut MutexGuard<'_, PotState>) {
        if guard.take_pending_wake() {
            self.broadcast();
        }
    }

    /// Cancel every worker: they leave at their next wake
    ///
    /// Never panics, so it is safe to call from an unwinding worker. Setting
    /// the flag is sound even on a poisoned lock; the other workers still
    /// panic when they next take it.
    pub fn cancel(&self) {
        debug!("Monitor::cancel: called");
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.cancel();
        self.wake_if_pending(&mut state);
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().is_cancelled()
    }

    /// Block until cancelled or `timeout` elapses; true if cancelled
    pub fn wait_cancelled(&self, timeout: Duration) -> bool {
        debug!(?timeout, "Monitor::wait_cancelled: called");
        let guard = self.lock();
        let (state, _) = unpoison(self.cond.wait_timeout_while(guard, timeout, |s| !s.is_cancelled()));
        state.is_cancelled()
    }

    /// Read a value out of the state under the lock
    pub fn inspect<T>(&self, f: impl FnOnce(&PotState) -> T) -> T {
        f(&self.lock())
    }
}

/// Cloneable handle that stops a running engine
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    monitor: Arc<Monitor>,
}

impl ShutdownHandle {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self { monitor }
    }

    /// Request shutdown; idempotent
    pub fn cancel(&self) {
        self.monitor.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.monitor.is_cancelled()
    }
}
