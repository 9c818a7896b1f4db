use crate::config::PoolConfig;
use crate::dispatch::{CancellationSignal, DispatchPool, Job, JobContext, Worker};
use crate::error::DispatchError;
use crate::identity::{AnnotationRouter, Identity, DEFAULT_IDENTITY_ANNOTATION};
use crate::session::SessionFactory;

use base64::prelude::BASE64_STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
struct TestSession {
    principal: Option<String>,
}

/// Session factory that counts `session_for` calls and rejects some names.
#[derive(Default)]
struct TestFactory {
    denied: Vec<String>,
    calls: Arc<Mutex<HashMap<String, usize>>>,
}

impl TestFactory {
    fn denying(names: &[&str]) -> Self {
        Self {
            denied: names.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl SessionFactory for TestFactory {
    type Session = TestSession;

    fn default_session(&self) -> anyhow::Result<TestSession> {
        Ok(TestSession { principal: None })
    }

    fn session_for(&self, identity: &str) -> anyhow::Result<TestSession> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(identity.to_string())
            .or_default() += 1;
        if self.denied.iter().any(|d| d == identity) {
            anyhow::bail!("{identity} is not allowed to impersonate");
        }
        Ok(TestSession {
            principal: Some(identity.to_string()),
        })
    }
}

type TestPool = DispatchPool<TestFactory>;

fn pool_with(pool_size: usize, factory: TestFactory) -> Arc<TestPool> {
    let config = PoolConfig::new(pool_size);
    Arc::new(DispatchPool::new(config, factory, AnnotationRouter::default()).unwrap())
}

fn start(pool: &Arc<TestPool>, signal: &CancellationSignal) -> JoinHandle<Result<(), DispatchError>> {
    let pool = pool.clone();
    let signal = signal.clone();
    thread::spawn(move || pool.start(&signal))
}

fn unscoped(name: &str) -> Value {
    json!({ "kind": "ConfigMap", "metadata": { "name": name } })
}

fn scoped(identity: &str, name: &str) -> Value {
    let mut annotations = serde_json::Map::new();
    annotations.insert(
        DEFAULT_IDENTITY_ANNOTATION.to_string(),
        Value::String(BASE64_STANDARD.encode(identity)),
    );
    json!({ "kind": "ConfigMap", "metadata": { "name": name, "annotations": annotations } })
}

/// Job that records (tag, worker, session principal) when it runs.
fn recording_job(
    tag: &str,
    payload: Value,
    log: &Arc<Mutex<Vec<(String, usize, Option<String>)>>>,
) -> Job<TestSession> {
    let log = log.clone();
    let tag = tag.to_string();
    Job::from_fn(tag.clone(), payload, move |ctx: JobContext, session: TestSession, _payload: Value| {
        let log = log.clone();
        let tag = tag.clone();
        async move {
            log.lock()
                .unwrap()
                .push((tag, ctx.worker_id, session.principal.clone()));
        }
    })
}

fn tags(log: &Arc<Mutex<Vec<(String, usize, Option<String>)>>>, prefix: &str) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|(tag, _, _)| tag.starts_with(prefix))
        .map(|(tag, _, _)| tag.clone())
        .collect()
}

//
// 1. Ordering on the default queue
//
#[test]
fn test_job_ordering_with_single_worker() {
    let pool = pool_with(1, TestFactory::default());
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);
    let log = Arc::new(Mutex::new(Vec::new()));

    for i in 0..20 {
        let tag = format!("D-{i}");
        pool.submit(recording_job(&tag, unscoped(&tag), &log));
    }

    signal.cancel();
    runner.join().unwrap().unwrap();

    assert_eq!(
        tags(&log, "D-"),
        (0..20).map(|i| format!("D-{i}")).collect::<Vec<_>>()
    );
    assert!(log.lock().unwrap().iter().all(|(_, _, p)| p.is_none()));
}

#[test]
fn test_many_jobs_on_many_workers_are_all_executed() {
    let pool = pool_with(4, TestFactory::default());
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);
    let count = Arc::new(AtomicUsize::new(0));

    for i in 0..200 {
        let count = count.clone();
        pool.submit(Job::from_fn(
            format!("job-{i}"),
            unscoped("x"),
            move |_ctx: JobContext, _s: TestSession, _p: Value| {
                let count = count.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            },
        ));
    }

    signal.cancel();
    runner.join().unwrap().unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 200);
}

//
// 2. Lanes per identity
//
#[test]
fn test_alice_and_bob_get_separate_lanes() {
    let factory = TestFactory::default();
    let calls = factory.calls.clone();
    let pool = pool_with(2, factory);
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);
    let log = Arc::new(Mutex::new(Vec::new()));

    // alice's first job and bob's job only finish if they run at the same time
    let rendezvous = Arc::new(Barrier::new(2));
    let with_rendezvous = |tag: &str, identity: &str| {
        let rendezvous = rendezvous.clone();
        let log = log.clone();
        let tag = tag.to_string();
        Job::from_fn(
            tag.clone(),
            scoped(identity, &tag),
            move |ctx: JobContext, session: TestSession, _p: Value| {
                let rendezvous = rendezvous.clone();
                let log = log.clone();
                let tag = tag.clone();
                async move {
                    rendezvous.wait();
                    log.lock().unwrap().push((tag, ctx.worker_id, session.principal));
                }
            },
        )
    };

    pool.submit(with_rendezvous("alice-1", "alice"));
    pool.submit(recording_job("alice-2", scoped("alice", "alice-2"), &log));
    pool.submit(with_rendezvous("bob-1", "bob"));

    assert_eq!(pool.lane_count(), 2);
    assert_eq!(pool.lane_identities(), vec!["alice", "bob"]);
    let alice_worker = pool.lane_worker_id("alice").unwrap();
    let bob_worker = pool.lane_worker_id("bob").unwrap();
    assert_ne!(alice_worker, bob_worker);

    signal.cancel();
    runner.join().unwrap().unwrap();

    assert_eq!(tags(&log, "alice-"), vec!["alice-1", "alice-2"]);
    let entries = log.lock().unwrap().clone();
    for (tag, worker, principal) in entries {
        if tag.starts_with("alice-") {
            assert_eq!(worker, alice_worker);
            assert_eq!(principal.as_deref(), Some("alice"));
        } else {
            assert_eq!(worker, bob_worker);
            assert_eq!(principal.as_deref(), Some("bob"));
        }
    }
    let calls = calls.lock().unwrap();
    assert_eq!(calls.get("alice"), Some(&1));
    assert_eq!(calls.get("bob"), Some(&1));
}

#[test]
fn test_concurrent_submitters_share_one_serialized_lane() {
    let factory = TestFactory::default();
    let calls = factory.calls.clone();
    let pool = pool_with(2, factory);
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);

    let active = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicBool::new(false));
    let workers = Arc::new(Mutex::new(Vec::new()));
    let start_line = Arc::new(Barrier::new(8));

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let pool = pool.clone();
            let active = active.clone();
            let overlapped = overlapped.clone();
            let workers = workers.clone();
            let start_line = start_line.clone();
            thread::spawn(move || {
                start_line.wait();
                for i in 0..5 {
                    let active = active.clone();
                    let overlapped = overlapped.clone();
                    let workers = workers.clone();
                    pool.submit(Job::from_fn(
                        format!("dave-{p}-{i}"),
                        scoped("dave", "dave"),
                        move |ctx: JobContext, _s: TestSession, _p: Value| {
                            let active = active.clone();
                            let overlapped = overlapped.clone();
                            let workers = workers.clone();
                            async move {
                                if active.fetch_add(1, Ordering::SeqCst) > 0 {
                                    overlapped.store(true, Ordering::SeqCst);
                                }
                                thread::sleep(Duration::from_millis(1));
                                workers.lock().unwrap().push(ctx.worker_id);
                                active.fetch_sub(1, Ordering::SeqCst);
                            }
                        },
                    ));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(pool.lane_count(), 1);
    signal.cancel();
    runner.join().unwrap().unwrap();

    let workers = workers.lock().unwrap();
    assert_eq!(workers.len(), 40);
    assert!(workers.iter().all(|w| *w == workers[0]));
    assert!(!overlapped.load(Ordering::SeqCst));
    assert_eq!(calls.lock().unwrap().get("dave"), Some(&1));
}

//
// 3. Backpressure
//
#[test]
fn test_full_default_queue_blocks_submitter() {
    let pool = pool_with(1, TestFactory::default());
    let log = Arc::new(Mutex::new(Vec::new()));

    // not started yet: the queue holds one job, the second submit has to wait
    pool.submit(recording_job("first", unscoped("first"), &log));

    let (submitted_tx, submitted_rx) = mpsc::channel();
    let blocked = {
        let pool = pool.clone();
        let log = log.clone();
        thread::spawn(move || {
            pool.submit(recording_job("second", unscoped("second"), &log));
            submitted_tx.send(()).unwrap();
        })
    };
    assert!(submitted_rx
        .recv_timeout(Duration::from_millis(200))
        .is_err());

    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);
    submitted_rx.recv_timeout(WAIT).unwrap();
    blocked.join().unwrap();

    signal.cancel();
    runner.join().unwrap().unwrap();
    assert_eq!(tags(&log, ""), vec!["first", "second"]);
}

#[test]
fn test_full_lane_blocks_submitter_without_blocking_other_identities() {
    let pool = pool_with(1, TestFactory::default());
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);
    let log = Arc::new(Mutex::new(Vec::new()));

    let (gate_tx, gate_rx) = async_channel::unbounded::<()>();
    let (entered_tx, entered_rx) = mpsc::channel();
    let entered_tx = Mutex::new(entered_tx);
    pool.submit(Job::from_fn(
        "erin-blocker",
        scoped("erin", "blocker"),
        move |_ctx: JobContext, _s: TestSession, _p: Value| {
            let gate_rx = gate_rx.clone();
            let _ = entered_tx.lock().unwrap().send(());
            async move {
                let _ = gate_rx.recv().await;
            }
        },
    ));
    entered_rx.recv_timeout(WAIT).unwrap();
    // the worker is busy, this one fills erin's queue
    pool.submit(recording_job("erin-queued", scoped("erin", "queued"), &log));

    let (submitted_tx, submitted_rx) = mpsc::channel();
    let blocked = {
        let pool = pool.clone();
        let log = log.clone();
        thread::spawn(move || {
            pool.submit(recording_job("erin-waiting", scoped("erin", "waiting"), &log));
            submitted_tx.send(()).unwrap();
        })
    };
    assert!(submitted_rx
        .recv_timeout(Duration::from_millis(200))
        .is_err());

    // frank is not affected by erin's backpressure
    assert_eq!(
        pool.try_submit(recording_job("frank-1", scoped("frank", "f"), &log))
            .unwrap(),
        Identity::principal("frank")
    );

    gate_tx.send_blocking(()).unwrap();
    submitted_rx.recv_timeout(WAIT).unwrap();
    blocked.join().unwrap();

    signal.cancel();
    runner.join().unwrap().unwrap();
    assert_eq!(tags(&log, "erin-"), vec!["erin-queued", "erin-waiting"]);
    assert_eq!(tags(&log, "frank-"), vec!["frank-1"]);
}

//
// 4. Failures
//
#[test]
fn test_rejected_identity_is_dropped_and_retried_later() {
    let factory = TestFactory::denying(&["carol"]);
    let calls = factory.calls.clone();
    let pool = pool_with(1, factory);
    let log = Arc::new(Mutex::new(Vec::new()));

    let result = pool.try_submit(recording_job("carol-1", scoped("carol", "c1"), &log));
    assert!(matches!(
        result,
        Err(DispatchError::Session { ref identity, .. }) if identity == "carol"
    ));
    assert_eq!(pool.lane_count(), 0);
    assert!(!pool.has_lane("carol"));

    // the logging variant drops it just the same
    pool.submit(recording_job("carol-2", scoped("carol", "c2"), &log));
    assert_eq!(calls.lock().unwrap().get("carol"), Some(&2));
    assert_eq!(pool.lane_count(), 0);

    let signal = CancellationSignal::new();
    signal.cancel();
    pool.start(&signal).unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_malformed_payload_is_dropped() {
    let pool = pool_with(1, TestFactory::default());
    let log = Arc::new(Mutex::new(Vec::new()));

    let result = pool.try_submit(recording_job("broken", json!(["not", "an", "object"]), &log));
    assert!(matches!(result, Err(DispatchError::Routing(_))));
    pool.submit(recording_job("broken-2", json!({"metadata": "nope"}), &log));

    let signal = CancellationSignal::new();
    signal.cancel();
    pool.start(&signal).unwrap();
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(pool.lane_count(), 0);
}

#[test]
fn test_default_session_failure_is_fatal() {
    struct Unreachable;
    impl SessionFactory for Unreachable {
        type Session = TestSession;
        fn default_session(&self) -> anyhow::Result<TestSession> {
            anyhow::bail!("backend unreachable")
        }
        fn session_for(&self, _identity: &str) -> anyhow::Result<TestSession> {
            unreachable!()
        }
    }

    let result = DispatchPool::with_annotation_router(PoolConfig::new(1), Unreachable);
    assert!(matches!(result, Err(DispatchError::DefaultSession(_))));
}

//
// 5. Lifecycle
//
#[test]
fn test_queued_jobs_are_drained_on_shutdown() {
    let pool = pool_with(2, TestFactory::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    pool.submit(recording_job("q-1", unscoped("a"), &log));
    pool.submit(recording_job("q-2", unscoped("b"), &log));

    // cancelled before the workers even exist
    let signal = CancellationSignal::new();
    signal.cancel();
    pool.start(&signal).unwrap();

    let mut executed = tags(&log, "q-");
    executed.sort();
    assert_eq!(executed, vec!["q-1", "q-2"]);
}

#[test]
fn test_shutdown_gives_up_on_a_stuck_lane_after_timeout() {
    let config = PoolConfig::new(2).with_shutdown_timeout(Duration::from_millis(100));
    let pool = Arc::new(DispatchPool::new(config, TestFactory::default(), AnnotationRouter::default()).unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));

    let (gate_tx, gate_rx) = async_channel::unbounded::<()>();
    pool.submit(Job::from_fn(
        "jo-stuck",
        scoped("jo", "stuck"),
        move |_ctx: JobContext, _s: TestSession, _p: Value| {
            let gate_rx = gate_rx.clone();
            async move {
                let _ = gate_rx.recv().await;
            }
        },
    ));
    pool.submit(recording_job("jo-queued", scoped("jo", "queued"), &log));

    let signal = CancellationSignal::new();
    signal.cancel();
    let started = Instant::now();
    pool.start(&signal).unwrap();
    assert!(started.elapsed() < WAIT);
    assert!(tags(&log, "jo-").is_empty());

    // the lane worker keeps draining after the pool has given up on it
    gate_tx.send_blocking(()).unwrap();
    let deadline = Instant::now() + WAIT;
    while tags(&log, "jo-").is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(tags(&log, "jo-"), vec!["jo-queued"]);
}

#[test]
fn test_start_only_once() {
    let pool = pool_with(1, TestFactory::default());
    let signal = CancellationSignal::new();
    signal.cancel();
    pool.start(&signal).unwrap();
    assert!(matches!(
        pool.start(&signal),
        Err(DispatchError::AlreadyStarted)
    ));
}

#[test]
fn test_submit_after_shutdown_is_rejected() {
    let pool = pool_with(1, TestFactory::default());
    let signal = CancellationSignal::new();
    signal.cancel();
    pool.start(&signal).unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    assert!(matches!(
        pool.try_submit(recording_job("late", unscoped("late"), &log)),
        Err(DispatchError::Closed)
    ));
    assert!(matches!(
        pool.try_submit(recording_job("late-alice", scoped("alice", "late"), &log)),
        Err(DispatchError::Closed)
    ));
    assert_eq!(pool.lane_count(), 0);
}

#[test]
fn test_configured_pool_size_runs_that_many_default_workers() {
    let pool = pool_with(5, TestFactory::default());
    assert_eq!(pool.pool_size(), 5);
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);

    // five jobs meeting at a barrier only complete with five workers
    let barrier = Arc::new(Barrier::new(5));
    let workers = Arc::new(Mutex::new(Vec::new()));
    let (done_tx, done_rx) = mpsc::channel();
    let done_tx = Arc::new(Mutex::new(done_tx));
    for i in 0..5 {
        let barrier = barrier.clone();
        let workers = workers.clone();
        let done_tx = done_tx.clone();
        pool.submit(Job::from_fn(
            format!("meet-{i}"),
            unscoped("meet"),
            move |ctx: JobContext, _s: TestSession, _p: Value| {
                let barrier = barrier.clone();
                let workers = workers.clone();
                let done_tx = done_tx.clone();
                async move {
                    barrier.wait();
                    workers.lock().unwrap().push(ctx.worker_id);
                    let _ = done_tx.lock().unwrap().send(());
                }
            },
        ));
    }
    for _ in 0..5 {
        done_rx.recv_timeout(WAIT).unwrap();
    }

    signal.cancel();
    runner.join().unwrap().unwrap();
    let mut workers = workers.lock().unwrap().clone();
    workers.sort();
    workers.dedup();
    assert_eq!(workers.len(), 5);
}

#[test]
fn test_zero_pool_size_set_directly_falls_back_to_default() {
    let mut config = PoolConfig::new(3);
    config.pool_size = 0;
    let pool = DispatchPool::new(config, TestFactory::default(), AnnotationRouter::default()).unwrap();
    assert_eq!(pool.pool_size(), 10);
    assert_eq!(pool.config().pool_size, 10);

    let config = PoolConfig {
        pool_size: 0,
        ..PoolConfig::default()
    };
    let pool = DispatchPool::new(config, TestFactory::default(), AnnotationRouter::default()).unwrap();
    assert_eq!(pool.pool_size(), 10);
}

//
// 6. Idle eviction
//
#[test]
fn test_idle_lane_is_evicted_and_recreated() {
    let factory = TestFactory::default();
    let calls = factory.calls.clone();
    let pool = pool_with(1, factory);
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);
    let log = Arc::new(Mutex::new(Vec::new()));

    pool.submit(recording_job("gina-1", scoped("gina", "g1"), &log));

    let deadline = Instant::now() + WAIT;
    let mut evicted = Vec::new();
    while evicted.is_empty() && Instant::now() < deadline {
        evicted = pool.evict_lanes_idle_for(Duration::ZERO);
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(evicted, vec!["gina"]);
    assert!(!pool.has_lane("gina"));
    assert_eq!(tags(&log, "gina-"), vec!["gina-1"]);

    pool.submit(recording_job("gina-2", scoped("gina", "g2"), &log));
    assert!(pool.has_lane("gina"));

    signal.cancel();
    runner.join().unwrap().unwrap();
    assert_eq!(tags(&log, "gina-"), vec!["gina-1", "gina-2"]);
    assert_eq!(calls.lock().unwrap().get("gina"), Some(&2));
}

#[test]
fn test_running_pool_evicts_idle_lanes_on_its_own() {
    let factory = TestFactory::default();
    let calls = factory.calls.clone();
    let config = PoolConfig::new(1).with_lane_idle_timeout(Some(Duration::from_millis(200)));
    let pool = Arc::new(DispatchPool::new(config, factory, AnnotationRouter::default()).unwrap());
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);
    let log = Arc::new(Mutex::new(Vec::new()));

    pool.submit(recording_job("ida-1", scoped("ida", "i1"), &log));
    assert!(pool.has_lane("ida"));

    let deadline = Instant::now() + WAIT;
    while pool.has_lane("ida") && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(!pool.has_lane("ida"));
    assert_eq!(tags(&log, "ida-"), vec!["ida-1"]);

    pool.submit(recording_job("ida-2", scoped("ida", "i2"), &log));

    signal.cancel();
    runner.join().unwrap().unwrap();
    assert_eq!(tags(&log, "ida-"), vec!["ida-1", "ida-2"]);
    assert_eq!(calls.lock().unwrap().get("ida"), Some(&2));
}

#[test]
fn test_busy_lane_is_not_evicted() {
    let pool = pool_with(1, TestFactory::default());
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);

    let (gate_tx, gate_rx) = async_channel::unbounded::<()>();
    pool.submit(Job::from_fn(
        "hank-blocker",
        scoped("hank", "blocker"),
        move |_ctx: JobContext, _s: TestSession, _p: Value| {
            let gate_rx = gate_rx.clone();
            async move {
                let _ = gate_rx.recv().await;
            }
        },
    ));

    assert!(pool.evict_lanes_idle_for(Duration::ZERO).is_empty());
    assert!(pool.has_lane("hank"));
    // without a configured timeout nothing is ever evicted
    assert!(pool.evict_idle_lanes().is_empty());

    gate_tx.send_blocking(()).unwrap();
    signal.cancel();
    runner.join().unwrap().unwrap();
}

//
// 7. Worker
//
#[test]
fn test_cancelled_worker_prefers_queued_jobs() {
    let (tx, rx) = async_channel::bounded(4);
    let signal = CancellationSignal::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    tx.send_blocking(recording_job("w-1", unscoped("w"), &log)).unwrap();
    tx.send_blocking(recording_job("w-2", unscoped("w"), &log)).unwrap();
    signal.cancel();

    let worker = Worker::new(
        7,
        "test-worker",
        Identity::Default,
        TestSession { principal: None },
        rx,
    )
    .with_cancellation(signal);
    assert_eq!(worker.id(), 7);
    // the sender is still open, only the signal can end the loop
    futures::executor::block_on(worker.run());

    assert_eq!(tags(&log, "w-"), vec!["w-1", "w-2"]);
    assert!(!tx.is_closed());
}

#[test]
fn test_worker_stops_when_queue_closes() {
    let (tx, rx) = async_channel::bounded(1);
    let log = Arc::new(Mutex::new(Vec::new()));
    let worker = Worker::new(
        1,
        "lanepool-test-close",
        Identity::principal("ivan"),
        TestSession {
            principal: Some("ivan".into()),
        },
        rx,
    );
    let (done_tx, done_rx) = async_channel::bounded::<()>(1);
    let handle = worker.spawn(done_tx).unwrap();

    tx.send_blocking(recording_job("ivan-1", unscoped("i"), &log)).unwrap();
    drop(tx);
    handle.join().unwrap();

    assert!(done_rx.recv_blocking().is_err());
    assert_eq!(tags(&log, "ivan-"), vec!["ivan-1"]);
}

#[test]
fn test_submit_async() {
    let pool = pool_with(1, TestFactory::default());
    let signal = CancellationSignal::new();
    let runner = start(&pool, &signal);
    let log = Arc::new(Mutex::new(Vec::new()));

    let identity = futures::executor::block_on(
        pool.submit_async(recording_job("jane-1", scoped("jane", "j1"), &log)),
    )
    .unwrap();
    assert_eq!(identity, Identity::principal("jane"));

    signal.cancel();
    runner.join().unwrap().unwrap();
    assert_eq!(tags(&log, "jane-"), vec!["jane-1"]);
}
