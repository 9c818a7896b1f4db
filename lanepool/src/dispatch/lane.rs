// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_channel::Sender;

use crate::dispatch::job::Job;

/// Queue and worker of one identity.
pub(crate) struct Lane<S> {
    pub(crate) tx: Sender<Job<S>>,
    pub(crate) worker_id: usize,
    pub(crate) activity: Arc<LaneActivity>,
}

/// Tracks whether a lane still has work, for idle eviction.
///
/// `pending` counts jobs from the moment a submitter resolves the lane (under
/// the lanes lock) until the lane worker has finished executing them.
#[derive(Debug)]
pub(crate) struct LaneActivity {
    pending: AtomicUsize,
    last_active: Mutex<Instant>,
}

impl LaneActivity {
    pub(crate) fn new() -> Self {
        Self {
            pending: AtomicUsize::new(0),
            last_active: Mutex::new(Instant::now()),
        }
    }

    pub(crate) fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.touch();
    }

    pub(crate) fn finish(&self) {
        // touch first, an observer of pending == 0 must see the fresh timestamp
        self.touch();
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn is_idle_for(&self, idle: Duration, now: Instant) -> bool {
        if self.pending() > 0 {
            return false;
        }
        let last_active = *self
            .last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        now.saturating_duration_since(last_active) >= idle
    }

    fn touch(&self) {
        *self
            .last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }
}
