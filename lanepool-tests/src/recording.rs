// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lanepool::{Job, JobContext, JobHandler, SessionFactory};
use serde_json::Value;

use crate::test_log::{LoggedExecution, TestLog};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSession {
    pub principal: Option<String>,
}

/// Session factory that counts how often each identity was asked for.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    denied: HashSet<String>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn denying(identities: &[&str]) -> Self {
        Self {
            denied: identities.iter().map(|i| i.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn calls_for(&self, identity: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(identity)
            .copied()
            .unwrap_or(0)
    }
}

impl SessionFactory for RecordingFactory {
    type Session = RecordingSession;

    fn default_session(&self) -> anyhow::Result<RecordingSession> {
        Ok(RecordingSession { principal: None })
    }

    fn session_for(&self, identity: &str) -> anyhow::Result<RecordingSession> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(identity.to_string())
            .or_default() += 1;
        if self.denied.contains(identity) {
            anyhow::bail!("cannot impersonate {identity}");
        }
        Ok(RecordingSession {
            principal: Some(identity.to_string()),
        })
    }
}

/// Handler that logs every execution and holds the worker for `hold`.
pub struct RecordingHandler {
    log: TestLog,
    tag: String,
    hold: Duration,
}

#[async_trait]
impl JobHandler<RecordingSession> for RecordingHandler {
    async fn handle(&self, ctx: JobContext, session: &RecordingSession, _payload: &Value) {
        let started = Instant::now();
        if !self.hold.is_zero() {
            thread::sleep(self.hold);
        }
        self.log.push(LoggedExecution {
            tag: self.tag.clone(),
            worker_id: ctx.worker_id,
            identity: ctx.identity,
            session_principal: session.principal.clone(),
            started,
            finished: Instant::now(),
        });
    }
}

pub fn recording_job(log: &TestLog, tag: &str, payload: Value) -> Job<RecordingSession> {
    holding_job(log, tag, payload, Duration::ZERO)
}

pub fn holding_job(
    log: &TestLog,
    tag: &str,
    payload: Value,
    hold: Duration,
) -> Job<RecordingSession> {
    let handler = RecordingHandler {
        log: log.clone(),
        tag: tag.to_string(),
        hold,
    };
    Job::new(tag, payload, Arc::new(handler))
}
