// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::session::SessionFactory;

/// An object as stored by the in-memory backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredObject {
    pub key: String,
    /// Principal whose session applied the object, `None` for the default session.
    pub applied_by: Option<String>,
    pub object: Value,
}

/// In-memory backend of the `lanepoold` daemon, keyed by `kind/namespace/name`.
#[derive(Debug, Clone, Default)]
pub struct ResourceStore {
    objects: Arc<Mutex<BTreeMap<String, StoredObject>>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the store key of an object. `None` if it has no `metadata.name`.
    pub fn key_of(object: &Value) -> Option<String> {
        let kind = object.get("kind").and_then(Value::as_str).unwrap_or("Object");
        let metadata = object.get("metadata")?;
        let name = metadata.get("name").and_then(Value::as_str)?;
        let namespace = metadata
            .get("namespace")
            .and_then(Value::as_str)
            .unwrap_or("");
        Some(format!("{kind}/{namespace}/{name}"))
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.lock().get(key).cloned()
    }

    pub fn snapshot(&self) -> Vec<StoredObject> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A handle to the store acting as one principal.
#[derive(Debug, Clone)]
pub struct StoreSession {
    principal: Option<String>,
    store: ResourceStore,
}

impl StoreSession {
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Creates or replaces the object, returns whether it existed before.
    pub fn apply(&self, key: String, object: Value) -> bool {
        let stored = StoredObject {
            key: key.clone(),
            applied_by: self.principal.clone(),
            object,
        };
        self.store.lock().insert(key, stored).is_some()
    }

    pub fn delete(&self, key: &str) -> Option<StoredObject> {
        self.store.lock().remove(key)
    }
}

/// Hands out [`StoreSession`]s, refusing the principals in its deny list.
#[derive(Debug, Clone, Default)]
pub struct StoreSessionFactory {
    store: ResourceStore,
    denied: HashSet<String>,
}

impl StoreSessionFactory {
    pub fn new(store: ResourceStore) -> Self {
        Self {
            store,
            denied: HashSet::new(),
        }
    }

    pub fn deny(mut self, identities: impl IntoIterator<Item = String>) -> Self {
        self.denied.extend(identities);
        self
    }
}

impl SessionFactory for StoreSessionFactory {
    type Session = StoreSession;

    fn default_session(&self) -> anyhow::Result<StoreSession> {
        Ok(StoreSession {
            principal: None,
            store: self.store.clone(),
        })
    }

    fn session_for(&self, identity: &str) -> anyhow::Result<StoreSession> {
        if self.denied.contains(identity) {
            anyhow::bail!("identity {identity} is not authorized");
        }
        Ok(StoreSession {
            principal: Some(identity.to_string()),
            store: self.store.clone(),
        })
    }
}
