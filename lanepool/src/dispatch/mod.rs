// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>
//! # Design: Identity-Aware Dispatch Pool
//!
//! ## Overview
//! A bounded worker pool that isolates jobs by the principal they run as.
//!
//! - The pool routes jobs to the default queue or to per-identity lanes.
//! - Every queue is bounded by the pool size; a full queue blocks the submitter.
//! - Lanes are spawned lazily on the first job of their identity, under one lock
//!   that is never held while enqueueing.
//! - A lane has exactly one worker, so the jobs of one identity never overlap.
//! - Shutdown closes all queues; workers drain what is queued and exit.
//! - Optionally, idle lanes are evicted and re-created on demand.
//!
//! ## Jobs
//! - A `Job` is a JSON payload plus an `Arc<dyn JobHandler<S>>`.
//! - The handler is called with a `JobContext`, the worker's session and the payload.
//!
//! ```text
//!         +--------------------------------------+
//!         |            Dispatch pool             |
//!         +----------+---------------------------+
//!                    |                     |
//!                    v                     v
//!         +----------+-----------+  +---------------+
//!         |  Per-identity lanes  |  | Default queue |
//!         +----+------+----+-----+  +-------+-------+
//!              |           |           |         |
//!         +----v----+  +---v----+  +---v----+ +--v-----+
//!         | alice   |  | bob    |  | dflt 1 | | dflt n |
//!         | worker  |  | worker |  | worker | | worker |
//!         +---------+  +--------+  +--------+ +--------+
//! ```

pub mod closure_job;
pub mod job;
mod lane;
pub mod pool;
pub mod signal;
pub mod worker;

pub use closure_job::ClosureHandler;
pub use job::{Job, JobContext, JobHandler};
pub use pool::DispatchPool;
pub use signal::CancellationSignal;
pub use worker::Worker;

#[cfg(test)]
mod tests;
