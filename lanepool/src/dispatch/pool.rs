// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::collections::HashMap;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender};
use async_io::Timer;
use futures::future::{select, Either};
use log::{debug, error, info, warn};

use crate::config::PoolConfig;
use crate::dispatch::job::Job;
use crate::dispatch::lane::{Lane, LaneActivity};
use crate::dispatch::signal::CancellationSignal;
use crate::dispatch::worker::Worker;
use crate::error::DispatchError;
use crate::identity::{AnnotationRouter, Identity, IdentityRouter};
use crate::session::SessionFactory;

const MIN_EVICTION_PERIOD: Duration = Duration::from_millis(100);
const MAX_EVICTION_PERIOD: Duration = Duration::from_secs(60);

/// Lanes by principal name. `done` is `None` once the pool has shut down.
struct LaneRegistry<S> {
    lanes: HashMap<String, Lane<S>>,
    done: Option<Sender<()>>,
}

/// Where a submitted job goes, resolved under the lanes lock and used after
/// it has been released.
struct Destination<S> {
    tx: Sender<Job<S>>,
    activity: Option<Arc<LaneActivity>>,
}

impl<S> Destination<S> {
    fn abort(&self) {
        if let Some(activity) = &self.activity {
            activity.finish();
        }
    }
}

/// Bounded pool of default workers plus one lane per principal identity.
///
/// Jobs without identity go to the default queue, drained by `pool_size`
/// workers sharing the default session. Jobs with an identity go to that
/// identity's lane, created on first use: a queue of capacity `pool_size` and
/// a single worker holding a session scoped to the identity. All jobs of one
/// identity therefore run one at a time, in submission order.
///
/// Submitting to a full queue blocks until a worker makes room.
pub struct DispatchPool<F, R = AnnotationRouter>
where
    F: SessionFactory,
{
    config: PoolConfig,
    factory: F,
    router: R,
    default_session: F::Session,
    default_tx: Sender<Job<F::Session>>,
    default_rx: Receiver<Job<F::Session>>,
    registry: Mutex<LaneRegistry<F::Session>>,
    done_rx: Receiver<()>,
    started: AtomicBool,
    next_worker_id: AtomicUsize,
}

impl<F> DispatchPool<F, AnnotationRouter>
where
    F: SessionFactory,
{
    /// Creates a pool that routes by the annotation configured in `config`.
    pub fn with_annotation_router(config: PoolConfig, factory: F) -> Result<Self, DispatchError> {
        let router = AnnotationRouter::from_config(&config);
        Self::new(config, factory, router)
    }
}

impl<F, R> DispatchPool<F, R>
where
    F: SessionFactory,
    R: IdentityRouter,
{
    /// Creates the pool and acquires the shared default session.
    ///
    /// No worker runs before [`run`](Self::run) or [`start`](Self::start), but
    /// the default queue already accepts up to `pool_size` jobs.
    pub fn new(config: PoolConfig, factory: F, router: R) -> Result<Self, DispatchError> {
        // pool_size may have been set directly, bypassing with_pool_size
        let pool_size = config.pool_size;
        let config = config.with_pool_size(pool_size);
        let default_session = factory
            .default_session()
            .map_err(DispatchError::DefaultSession)?;
        let (default_tx, default_rx) = async_channel::bounded(config.pool_size);
        let (done_tx, done_rx) = async_channel::bounded(1);

        Ok(Self {
            config,
            factory,
            router,
            default_session,
            default_tx,
            default_rx,
            registry: Mutex::new(LaneRegistry {
                lanes: HashMap::new(),
                done: Some(done_tx),
            }),
            done_rx,
            started: AtomicBool::new(false),
            next_worker_id: AtomicUsize::new(1),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    pub fn lane_count(&self) -> usize {
        self.lock_registry().lanes.len()
    }

    pub fn has_lane(&self, identity: &str) -> bool {
        self.lock_registry().lanes.contains_key(identity)
    }

    /// Id of the worker serving `identity`, if it has a lane.
    pub fn lane_worker_id(&self, identity: &str) -> Option<usize> {
        self.lock_registry()
            .lanes
            .get(identity)
            .map(|lane| lane.worker_id)
    }

    pub fn lane_identities(&self) -> Vec<String> {
        let mut identities: Vec<String> = self.lock_registry().lanes.keys().cloned().collect();
        identities.sort();
        identities
    }

    /// Submits a job, logging and dropping it if it cannot be routed.
    ///
    /// Blocks the calling thread while the destination queue is full.
    pub fn submit(&self, job: Job<F::Session>) {
        let desc = job.desc().to_string();
        if let Err(e) = self.try_submit(job) {
            error!("Dropping job {}: {}", desc, e);
        }
    }

    /// Like [`submit`](Self::submit), but returns the identity the job was
    /// routed by, or why it was dropped.
    pub fn try_submit(&self, job: Job<F::Session>) -> Result<Identity, DispatchError> {
        let identity = self.router.extract(job.payload())?;
        let destination = self.resolve(&identity)?;
        // the lanes lock is released here, this send may block on a full queue
        if destination.tx.send_blocking(job).is_err() {
            destination.abort();
            return Err(DispatchError::Closed);
        }
        Ok(identity)
    }

    /// Like [`try_submit`](Self::try_submit), but waits for queue space
    /// asynchronously instead of blocking the thread.
    pub async fn submit_async(&self, job: Job<F::Session>) -> Result<Identity, DispatchError> {
        let identity = self.router.extract(job.payload())?;
        let destination = self.resolve(&identity)?;
        if destination.tx.send(job).await.is_err() {
            destination.abort();
            return Err(DispatchError::Closed);
        }
        Ok(identity)
    }

    /// Get or lazily create the queue for `identity`.
    fn resolve(&self, identity: &Identity) -> Result<Destination<F::Session>, DispatchError> {
        let Identity::Principal(name) = identity else {
            return Ok(Destination {
                tx: self.default_tx.clone(),
                activity: None,
            });
        };

        let mut registry = self.lock_registry();
        let Some(done) = registry.done.clone() else {
            return Err(DispatchError::Closed);
        };
        if !registry.lanes.contains_key(name) {
            let lane = self.create_lane(name, done)?;
            registry.lanes.insert(name.clone(), lane);
        }
        let lane = &registry.lanes[name];
        lane.activity.begin();
        let destination = Destination {
            tx: lane.tx.clone(),
            activity: Some(Arc::clone(&lane.activity)),
        };
        drop(registry);

        Ok(destination)
    }

    fn create_lane(&self, identity: &str, done: Sender<()>) -> Result<Lane<F::Session>, DispatchError> {
        let session =
            self.factory
                .session_for(identity)
                .map_err(|source| DispatchError::Session {
                    identity: identity.to_string(),
                    source,
                })?;

        let (tx, rx) = async_channel::bounded(self.config.pool_size);
        let activity = Arc::new(LaneActivity::new());
        let worker_id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
        Worker::new(
            worker_id,
            format!("lanepool-lane-{worker_id}"),
            Identity::principal(identity),
            session,
            rx,
        )
        .with_activity(Arc::clone(&activity))
        .spawn(done)?;

        info!("Spawned new lane for {} on worker {}", identity, worker_id);
        Ok(Lane {
            tx,
            worker_id,
            activity,
        })
    }

    /// Starts the default workers and blocks the calling thread until `signal`
    /// fires, then shuts the pool down.
    pub fn start(&self, signal: &CancellationSignal) -> Result<(), DispatchError> {
        futures::executor::block_on(self.run(signal))
    }

    /// Async form of [`start`](Self::start).
    ///
    /// On cancellation every queue is closed. Workers still execute what was
    /// queued before; this waits up to `shutdown_timeout` for them to finish.
    pub async fn run(&self, signal: &CancellationSignal) -> Result<(), DispatchError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(DispatchError::AlreadyStarted);
        }
        let done = self
            .lock_registry()
            .done
            .clone()
            .ok_or(DispatchError::Closed)?;

        for _ in 0..self.config.pool_size {
            let worker_id = self.next_worker_id.fetch_add(1, Ordering::Relaxed);
            let worker = Worker::new(
                worker_id,
                format!("lanepool-default-{worker_id}"),
                Identity::Default,
                self.default_session.clone(),
                self.default_rx.clone(),
            );
            if let Err(e) = worker.spawn(done.clone()) {
                error!("Failed to start dispatch pool: {}", e);
                drop(done);
                self.shutdown().await;
                return Err(e);
            }
        }
        drop(done);
        info!(
            "Started dispatch pool with {} default workers",
            self.config.pool_size
        );

        self.wait_for_cancellation(signal).await;
        info!("Cancellation received, shutting down dispatch pool");
        self.shutdown().await;
        Ok(())
    }

    async fn wait_for_cancellation(&self, signal: &CancellationSignal) {
        let Some(idle_timeout) = self.config.lane_idle_timeout else {
            signal.cancelled().await;
            return;
        };

        let period = (idle_timeout / 2).clamp(MIN_EVICTION_PERIOD, MAX_EVICTION_PERIOD);
        loop {
            let cancelled = pin!(signal.cancelled());
            let tick = pin!(Timer::after(period));
            match select(cancelled, tick).await {
                Either::Left(_) => return,
                Either::Right(_) => {
                    self.evict_idle_lanes();
                }
            }
        }
    }

    /// Removes lanes that have been idle longer than the configured
    /// `lane_idle_timeout`. Does nothing when no timeout is configured.
    pub fn evict_idle_lanes(&self) -> Vec<String> {
        match self.config.lane_idle_timeout {
            Some(idle_timeout) => self.evict_lanes_idle_for(idle_timeout),
            None => Vec::new(),
        }
    }

    /// Removes every lane without pending jobs whose last activity is at least
    /// `idle` ago and returns their identities.
    ///
    /// The lane worker drains and exits once the lane is gone. A later job for
    /// the same identity creates a new lane with a fresh session.
    pub fn evict_lanes_idle_for(&self, idle: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut evicted = Vec::new();
        let mut registry = self.lock_registry();
        registry.lanes.retain(|identity, lane| {
            if lane.activity.is_idle_for(idle, now) {
                evicted.push(identity.clone());
                false
            } else {
                true
            }
        });
        drop(registry);

        for identity in &evicted {
            info!("Evicted idle lane for {}", identity);
        }
        evicted
    }

    async fn shutdown(&self) {
        let lanes = {
            let mut registry = self.lock_registry();
            registry.done = None;
            std::mem::take(&mut registry.lanes)
        };

        self.default_tx.close();
        for (identity, lane) in &lanes {
            debug!(
                "Closing lane for {} ({} pending jobs)",
                identity,
                lane.activity.pending()
            );
            lane.tx.close();
        }

        let timeout = self.config.shutdown_timeout;
        debug!("Waiting up to {:?} for workers to drain their queues", timeout);
        let drained = pin!(self.done_rx.recv());
        let timer = pin!(Timer::after(timeout));
        match select(drained, timer).await {
            Either::Left(_) => info!("All workers stopped, dispatch pool shut down"),
            Either::Right(_) => {
                let lane_backlog: usize = lanes.values().map(|lane| lane.tx.len()).sum();
                warn!(
                    "Workers did not stop within {:?}, {} jobs left in the default queue and {} in lane queues",
                    timeout,
                    self.default_rx.len(),
                    lane_backlog
                );
            }
        }
    }

    fn lock_registry(&self) -> MutexGuard<'_, LaneRegistry<F::Session>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
