// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::pin::pin;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_channel::{Receiver, Sender};
use futures::future::{select, Either};
use log::{debug, info};

use crate::dispatch::job::{Job, JobContext};
use crate::dispatch::lane::LaneActivity;
use crate::dispatch::signal::CancellationSignal;
use crate::error::DispatchError;
use crate::identity::Identity;

/// A long-lived consumer bound to one queue and one session.
///
/// Jobs are executed one at a time, in the order they were taken from the
/// queue. The loop ends when the queue is closed and drained, or when the
/// optional cancellation signal fires while the queue is empty.
pub struct Worker<S> {
    id: usize,
    name: String,
    identity: Identity,
    session: S,
    queue: Receiver<Job<S>>,
    cancellation: Option<CancellationSignal>,
    activity: Option<Arc<LaneActivity>>,
}

impl<S> Worker<S>
where
    S: Send + Sync + 'static,
{
    pub fn new(
        id: usize,
        name: impl Into<String>,
        identity: Identity,
        session: S,
        queue: Receiver<Job<S>>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            identity,
            session,
            queue,
            cancellation: None,
            activity: None,
        }
    }

    /// Lets the worker stop on `signal` instead of waiting for its queue to
    /// close. Jobs already in the queue are still preferred over the signal.
    ///
    /// The pool never sets this, its workers stop by queue closure only. It is
    /// meant for callers that run a `Worker` on a queue of their own.
    pub fn with_cancellation(mut self, signal: CancellationSignal) -> Self {
        self.cancellation = Some(signal);
        self
    }

    pub(crate) fn with_activity(mut self, activity: Arc<LaneActivity>) -> Self {
        self.activity = Some(activity);
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The consume loop.
    pub async fn run(self) {
        info!("Starting worker {} for {}", self.name, self.identity);
        while let Some(job) = self.next_job().await {
            debug!("{}: executing job: {}", self.name, job.desc());
            let ctx = JobContext {
                worker_id: self.id,
                identity: self.identity.clone(),
            };
            job.execute(ctx, &self.session).await;
            if let Some(activity) = &self.activity {
                activity.finish();
            }
        }
        info!("Worker {} for {} stopped", self.name, self.identity);
    }

    async fn next_job(&self) -> Option<Job<S>> {
        let Some(signal) = &self.cancellation else {
            return self.queue.recv().await.ok();
        };

        // select polls the queue first, so queued jobs win over the signal
        let recv = pin!(self.queue.recv());
        let cancelled = pin!(signal.cancelled());
        match select(recv, cancelled).await {
            Either::Left((job, _)) => job.ok(),
            Either::Right(((), _)) => {
                debug!("{}: cancelled while waiting for jobs", self.name);
                None
            }
        }
    }

    /// Runs the consume loop on a dedicated thread named after the worker.
    ///
    /// `done` is held until the loop has ended, so whoever owns the receiving
    /// side can wait for all workers to exit.
    pub fn spawn(self, done: Sender<()>) -> Result<JoinHandle<()>, DispatchError> {
        let name = self.name.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                futures::executor::block_on(self.run());
                drop(done);
            })
            .map_err(|source| DispatchError::Spawn { name, source })
    }
}
