// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::identity::Identity;

/// Execution context handed to a handler.
///
/// It carries no cancellation: once a worker has taken a job, the job runs to
/// completion.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct JobContext {
    /// Id of the worker running the job, unique within one pool.
    pub worker_id: usize,
    /// The identity the job was routed by.
    pub identity: Identity,
}

/// Knows how to execute a payload against a session.
///
/// The dispatcher never looks into the payload, so "apply", "delete" and any
/// other operation kind are just different handlers. A handler owns its
/// failures: log them and return, the worker does not retry.
#[async_trait]
pub trait JobHandler<S>: Send + Sync + 'static {
    async fn handle(&self, ctx: JobContext, session: &S, payload: &Value);
}

/// One unit of work: a payload and the handler that executes it.
pub struct Job<S> {
    desc: String,
    payload: Value,
    handler: Arc<dyn JobHandler<S>>,
}

impl<S> Job<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(desc: impl Into<String>, payload: Value, handler: Arc<dyn JobHandler<S>>) -> Self {
        Self {
            desc: desc.into(),
            payload,
            handler,
        }
    }

    /// Free-form description, used for logging
    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub(crate) async fn execute(self, ctx: JobContext, session: &S) {
        self.handler.handle(ctx, session, &self.payload).await;
    }
}

impl<S> std::fmt::Debug for Job<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("desc", &self.desc)
            .field("payload", &self.payload)
            .finish()
    }
}
