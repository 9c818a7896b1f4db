// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use async_trait::async_trait;
use log::{debug, error, info};
use serde_json::Value;

use crate::dispatch::job::{JobContext, JobHandler};
use crate::jobs::resource_store::{ResourceStore, StoreSession};

#[derive(Debug, Default)]
pub struct DeleteHandler;

#[async_trait]
impl JobHandler<StoreSession> for DeleteHandler {
    async fn handle(&self, ctx: JobContext, session: &StoreSession, payload: &Value) {
        let Some(key) = ResourceStore::key_of(payload) else {
            error!("worker {}: cannot delete object without metadata.name", ctx.worker_id);
            return;
        };
        match session.delete(&key) {
            Some(_) => info!("worker {}: deleted {} as {}", ctx.worker_id, key, ctx.identity),
            // do nothing, deleting is idempotent
            None => debug!("worker {}: {} is already gone", ctx.worker_id, key),
        }
    }
}
