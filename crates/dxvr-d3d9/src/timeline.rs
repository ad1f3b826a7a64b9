//! Monotonic GPU submission timeline.
//!
//! Every submission to the graphics queue takes the next sequence number. The GPU (or, in
//! [`CompletionMode::Deferred`], whoever drives it) marks sequences retired in order. Waits are
//! untimed: GPU completion is assumed to be bounded.

use std::sync::{Condvar, Mutex};

use tracing::trace;

use crate::lock_unpoisoned;

/// When submitted work is reported as retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    /// Work retires as soon as it is submitted.
    #[default]
    Immediate,
    /// Work stays outstanding until [`GpuTimeline::retire_through`] or
    /// [`GpuTimeline::retire_all`] is called.
    Deferred,
}

#[derive(Debug, Default)]
struct TimelineState {
    submitted: u64,
    retired: u64,
}

#[derive(Debug)]
pub struct GpuTimeline {
    mode: CompletionMode,
    state: Mutex<TimelineState>,
    retired_cv: Condvar,
}

impl GpuTimeline {
    pub fn new(mode: CompletionMode) -> Self {
        Self {
            mode,
            state: Mutex::new(TimelineState::default()),
            retired_cv: Condvar::new(),
        }
    }

    pub fn mode(&self) -> CompletionMode {
        self.mode
    }

    /// Submit one unit of work and return its sequence number.
    pub fn submit(&self) -> u64 {
        let mut state = lock_unpoisoned(&self.state);
        state.submitted += 1;
        let seq = state.submitted;
        if self.mode == CompletionMode::Immediate {
            state.retired = seq;
            self.retired_cv.notify_all();
        }
        trace!(seq, "gpu submission");
        seq
    }

    /// Mark every submission up to and including `seq` as retired.
    ///
    /// Sequences that have not been submitted yet are ignored; retirement never runs ahead of
    /// submission.
    pub fn retire_through(&self, seq: u64) {
        let mut state = lock_unpoisoned(&self.state);
        let target = seq.min(state.submitted);
        if target > state.retired {
            state.retired = target;
            trace!(retired = target, "gpu retired");
            self.retired_cv.notify_all();
        }
    }

    pub fn retire_all(&self) {
        let mut state = lock_unpoisoned(&self.state);
        if state.retired != state.submitted {
            state.retired = state.submitted;
            self.retired_cv.notify_all();
        }
    }

    pub fn last_submitted(&self) -> u64 {
        lock_unpoisoned(&self.state).submitted
    }

    pub fn last_retired(&self) -> u64 {
        lock_unpoisoned(&self.state).retired
    }

    pub fn is_retired(&self, seq: u64) -> bool {
        lock_unpoisoned(&self.state).retired >= seq
    }

    /// Number of submissions that have not retired yet.
    pub fn outstanding(&self) -> u64 {
        let state = lock_unpoisoned(&self.state);
        state.submitted - state.retired
    }

    /// Block until `seq` has retired.
    pub fn wait(&self, seq: u64) {
        let mut state = lock_unpoisoned(&self.state);
        while state.retired < seq {
            state = self
                .retired_cv
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }

    /// Block until nothing is outstanding, including work submitted while waiting.
    pub fn wait_idle(&self) {
        let mut state = lock_unpoisoned(&self.state);
        while state.retired < state.submitted {
            state = self
                .retired_cv
                .wait(state)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

impl Default for GpuTimeline {
    fn default() -> Self {
        Self::new(CompletionMode::default())
    }
}
