// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::job::{Job, JobHandler};
use crate::jobs::apply_job::ApplyHandler;
use crate::jobs::delete_job::DeleteHandler;
use crate::jobs::resource_store::{ResourceStore, StoreSession};

/// One line of `lanepoold` input.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum JobRequest {
    #[serde(rename = "apply")]
    Apply { object: Value },

    #[serde(rename = "delete")]
    Delete { object: Value },
}

/// The handlers requests are turned into jobs with, shared by all jobs.
#[derive(Clone)]
pub struct Handlers {
    apply: Arc<dyn JobHandler<StoreSession>>,
    delete: Arc<dyn JobHandler<StoreSession>>,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            apply: Arc::new(ApplyHandler),
            delete: Arc::new(DeleteHandler),
        }
    }
}

impl JobRequest {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    pub fn into_job(self, handlers: &Handlers) -> Job<StoreSession> {
        let (op, object, handler) = match self {
            JobRequest::Apply { object } => ("apply", object, Arc::clone(&handlers.apply)),
            JobRequest::Delete { object } => ("delete", object, Arc::clone(&handlers.delete)),
        };
        let desc = match ResourceStore::key_of(&object) {
            Some(key) => format!("{op} {key}"),
            None => op.to_string(),
        };
        Job::new(desc, object, handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requests() {
        let job = JobRequest::parse(
            r#"{"op": "apply", "object": {"kind": "Secret", "metadata": {"name": "db"}}}"#,
        )
        .unwrap()
        .into_job(&Handlers::default());
        assert_eq!(job.desc(), "apply Secret//db");

        let job = JobRequest::parse(r#"{"op": "delete", "object": {}}"#)
            .unwrap()
            .into_job(&Handlers::default());
        assert_eq!(job.desc(), "delete");

        assert!(JobRequest::parse(r#"{"op": "patch", "object": {}}"#).is_err());
        assert!(JobRequest::parse("not json").is_err());
    }
}
