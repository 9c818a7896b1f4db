// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dispatch::job::{Job, JobContext, JobHandler};

/// A [`JobHandler`] backed by an async closure.
///
/// The closure receives clones of the session and the payload, so the future
/// it returns can be `'static`.
pub struct ClosureHandler<F> {
    f: F,
}

impl<F> ClosureHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<S, F, Fut> JobHandler<S> for ClosureHandler<F>
where
    S: Clone + Send + Sync + 'static,
    F: Fn(JobContext, S, Value) -> Fut // closure returns any future
        + Send // the closure itself can be sent across threads
        + Sync
        + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, ctx: JobContext, session: &S, payload: &Value) {
        (self.f)(ctx, session.clone(), payload.clone()).await;
    }
}

impl<S> Job<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Builds a job whose handler is an async closure.
    pub fn from_fn<F, Fut>(desc: impl Into<String>, payload: Value, f: F) -> Self
    where
        F: Fn(JobContext, S, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Job::new(desc, payload, Arc::new(ClosureHandler::new(f)))
    }
}
