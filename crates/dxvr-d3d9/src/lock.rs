//! Device lock serializing command recording and submission.
//!
//! The lock is recursive per thread: a thread that already holds it may take it again, so a
//! render thread that locked the device can keep issuing device calls. Guards are owned values
//! and can be stored across calls; the lock is released when the last guard is dropped.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};

use tracing::warn;

use crate::lock_unpoisoned;

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: u32,
}

#[derive(Debug, Default)]
struct LockInner {
    state: Mutex<LockState>,
    released: Condvar,
}

#[derive(Debug, Clone, Default)]
pub struct DeviceLock {
    inner: Arc<LockInner>,
}

impl DeviceLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock, blocking while another thread holds it. There is no timeout.
    pub fn acquire(&self) -> DeviceLockGuard {
        let me = thread::current().id();
        let mut state = lock_unpoisoned(&self.inner.state);
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    break;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    break;
                }
                Some(_) => {
                    state = self
                        .inner
                        .released
                        .wait(state)
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
                }
            }
        }
        DeviceLockGuard {
            inner: self.inner.clone(),
            owner: me,
        }
    }

    pub fn try_acquire(&self) -> Option<DeviceLockGuard> {
        let me = thread::current().id();
        let mut state = lock_unpoisoned(&self.inner.state);
        match state.owner {
            None => {
                state.owner = Some(me);
                state.depth = 1;
            }
            Some(owner) if owner == me => state.depth += 1,
            Some(_) => return None,
        }
        Some(DeviceLockGuard {
            inner: self.inner.clone(),
            owner: me,
        })
    }

    pub fn is_locked(&self) -> bool {
        lock_unpoisoned(&self.inner.state).owner.is_some()
    }

    /// Whether the calling thread currently holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        lock_unpoisoned(&self.inner.state).owner == Some(thread::current().id())
    }
}

/// Owned hold on a [`DeviceLock`].
#[derive(Debug)]
#[must_use = "the device lock is released as soon as the guard is dropped"]
pub struct DeviceLockGuard {
    inner: Arc<LockInner>,
    owner: ThreadId,
}

impl Drop for DeviceLockGuard {
    fn drop(&mut self) {
        let mut state = lock_unpoisoned(&self.inner.state);
        if state.owner != Some(self.owner) {
            warn!("device lock released by a guard that does not own it");
        }
        if thread::current().id() != self.owner {
            warn!("device lock released from a different thread than the one that acquired it");
        }
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            self.inner.released.notify_one();
        }
    }
}
