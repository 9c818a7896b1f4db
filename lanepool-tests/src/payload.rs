// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use base64::prelude::BASE64_STANDARD;
use base64::Engine as _;
use lanepool::identity::DEFAULT_IDENTITY_ANNOTATION;
use serde_json::{json, Map, Value};

/// An object without identity annotation.
pub fn object(kind: &str, name: &str) -> Value {
    json!({ "kind": kind, "metadata": { "name": name, "namespace": "default" } })
}

/// An object that has to be handled as `identity`.
pub fn owned_by(identity: &str, kind: &str, name: &str) -> Value {
    let mut value = object(kind, name);
    let mut annotations = Map::new();
    annotations.insert(
        DEFAULT_IDENTITY_ANNOTATION.to_string(),
        Value::String(BASE64_STANDARD.encode(identity)),
    );
    value["metadata"]["annotations"] = Value::Object(annotations);
    value
}
