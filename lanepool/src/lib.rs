// SPDX-License-Identifier: MIT
// lanepool: bounded, identity-aware job dispatcher
//
// - Runs jobs without a principal on a fixed pool of default workers.
// - Runs the jobs of each principal on a dedicated lane with its own session.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod config;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod jobs;
pub mod session;

pub use config::PoolConfig;
pub use dispatch::{CancellationSignal, ClosureHandler, DispatchPool, Job, JobContext, JobHandler, Worker};
pub use error::{DispatchError, RoutingError};
pub use identity::{AnnotationRouter, Identity, IdentityEncoding, IdentityRouter};
pub use session::SessionFactory;
