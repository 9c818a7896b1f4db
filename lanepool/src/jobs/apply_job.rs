// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::dispatch::job::{JobContext, JobHandler};
use crate::jobs::resource_store::{ResourceStore, StoreSession};

/// Creates or replaces an object with the worker's session.
#[derive(Debug, Default)]
pub struct ApplyHandler;

#[async_trait]
impl JobHandler<StoreSession> for ApplyHandler {
    async fn handle(&self, ctx: JobContext, session: &StoreSession, payload: &Value) {
        let Some(key) = ResourceStore::key_of(payload) else {
            error!("worker {}: cannot apply object without metadata.name", ctx.worker_id);
            return;
        };
        let replaced = session.apply(key.clone(), payload.clone());
        info!(
            "worker {}: {} {} as {}",
            ctx.worker_id,
            if replaced { "updated" } else { "created" },
            key,
            ctx.identity
        );
    }
}
