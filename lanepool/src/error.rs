// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! Error types of the dispatcher.
//!
//! None of these errors reach the producer through `submit`: they are logged
//! and the affected job is dropped. `try_submit`, `run` and `start` return them
//! for callers that want to observe the outcome.

use std::string::FromUtf8Error;

/// The payload could not be inspected for a principal identity.
#[derive(thiserror::Error, Debug)]
pub enum RoutingError {
    /// The payload is not a JSON object.
    #[error("payload is not a JSON object")]
    NotAnObject,

    /// A field on the path to the annotation exists but is not an object.
    #[error("field `{field}` is not an object")]
    FieldNotAnObject { field: &'static str },

    /// The identity annotation is present but not a string.
    #[error("annotation `{key}` is not a string")]
    NotAString { key: String },

    /// The identity annotation is not valid base64.
    #[error("annotation `{key}` is not valid base64: {source}")]
    Decode {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// The decoded identity is not valid UTF-8.
    #[error("annotation `{key}` does not decode to UTF-8: {source}")]
    Utf8 {
        key: String,
        #[source]
        source: FromUtf8Error,
    },
}

/// Failures of the dispatch pool.
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    /// The job carried a malformed payload.
    #[error("failed to get identity from payload: {0}")]
    Routing(#[from] RoutingError),

    /// The session factory rejected a principal. No lane was created.
    #[error("failed to acquire session for identity {identity}: {source:#}")]
    Session {
        identity: String,
        #[source]
        source: anyhow::Error,
    },

    /// The shared session for the default workers could not be built.
    #[error("failed to acquire default session: {0:#}")]
    DefaultSession(#[source] anyhow::Error),

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// `start`/`run` was called a second time.
    #[error("dispatch pool has already been started")]
    AlreadyStarted,

    /// The pool has been shut down; its queues no longer accept jobs.
    #[error("dispatch pool is shut down")]
    Closed,
}
