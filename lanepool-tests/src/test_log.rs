// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::{Arc, Mutex};
use std::time::Instant;

use lanepool::Identity;

#[derive(Debug, Clone)]
pub struct LoggedExecution {
    pub tag: String,

    pub worker_id: usize,

    pub identity: Identity,

    /// Principal of the session the job ran with.
    pub session_principal: Option<String>,

    pub started: Instant,

    pub finished: Instant,
}

impl LoggedExecution {
    pub fn overlaps(&self, other: &LoggedExecution) -> bool {
        self.started < other.finished && other.started < self.finished
    }
}

/// Executions in the order they finished, shared between handlers and the test.
#[derive(Debug, Clone, Default)]
pub struct TestLog {
    events: Arc<Mutex<Vec<LoggedExecution>>>,
}

impl TestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, execution: LoggedExecution) {
        self.events.lock().unwrap().push(execution);
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn executions(&self) -> Vec<LoggedExecution> {
        self.events.lock().unwrap().clone()
    }

    pub fn for_identity(&self, identity: &Identity) -> Vec<LoggedExecution> {
        self.executions()
            .into_iter()
            .filter(|e| &e.identity == identity)
            .collect()
    }

    pub fn tags_for(&self, identity: &Identity) -> Vec<String> {
        self.for_identity(identity)
            .into_iter()
            .map(|e| e.tag)
            .collect()
    }

    /// True if no two executions of `identity` ran at the same time.
    pub fn is_serialized(&self, identity: &Identity) -> bool {
        let executions = self.for_identity(identity);
        executions.iter().enumerate().all(|(i, a)| {
            executions[i + 1..].iter().all(|b| !a.overlaps(b))
        })
    }
}
