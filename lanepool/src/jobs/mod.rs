// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! Jobs of the `lanepoold` daemon: an in-memory resource store and the
//! handlers that apply and delete objects in it.

pub mod apply_job;
pub mod delete_job;
pub mod request;
pub mod resource_store;

pub use apply_job::ApplyHandler;
pub use delete_job::DeleteHandler;
pub use request::{Handlers, JobRequest};
pub use resource_store::{ResourceStore, StoreSession, StoreSessionFactory, StoredObject};
