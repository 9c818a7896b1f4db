// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use base64::prelude::BASE64_STANDARD;
use base64::Engine as _;
use clap::ValueEnum;
use serde_json::Value;

use crate::config::PoolConfig;
use crate::error::RoutingError;

/// Annotation that names the principal a job has to run as.
pub const DEFAULT_IDENTITY_ANNOTATION: &str = "open-cluster-management.io/user-identity";

/// The principal a job runs as.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Identity {
    /// No principal, the job runs on the default workers with the shared session.
    Default,
    /// A principal that gets a dedicated lane.
    Principal(String),
}

impl Identity {
    pub fn principal(name: impl Into<String>) -> Self {
        Identity::Principal(name.into())
    }

    pub fn as_principal(&self) -> Option<&str> {
        match self {
            Identity::Default => None,
            Identity::Principal(name) => Some(name),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identity::Default => f.write_str("<default>"),
            Identity::Principal(name) => f.write_str(name),
        }
    }
}

/// Decides which identity a payload runs as.
pub trait IdentityRouter: Send + Sync + 'static {
    /// Returns [`Identity::Default`] when the payload names no principal. Fails
    /// only on a malformed payload, never on a missing annotation.
    fn extract(&self, payload: &Value) -> Result<Identity, RoutingError>;
}

/// How the identity annotation value is encoded.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
#[clap(rename_all = "kebab-case")]
pub enum IdentityEncoding {
    #[default]
    /// Standard base64 of the UTF-8 principal name
    Base64,
    /// The principal name as is
    Plain,
}

/// Reads the identity from `metadata.annotations[<key>]` of a JSON object.
#[derive(Debug, Clone)]
pub struct AnnotationRouter {
    key: String,
    encoding: IdentityEncoding,
}

impl AnnotationRouter {
    pub fn new(key: impl Into<String>, encoding: IdentityEncoding) -> Self {
        Self {
            key: key.into(),
            encoding,
        }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.identity_annotation.clone(), config.identity_encoding)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn decode(&self, raw: &str) -> Result<String, RoutingError> {
        match self.encoding {
            IdentityEncoding::Plain => Ok(raw.to_string()),
            IdentityEncoding::Base64 => {
                let bytes = BASE64_STANDARD
                    .decode(raw.trim())
                    .map_err(|source| RoutingError::Decode {
                        key: self.key.clone(),
                        source,
                    })?;
                String::from_utf8(bytes).map_err(|source| RoutingError::Utf8 {
                    key: self.key.clone(),
                    source,
                })
            }
        }
    }
}

impl Default for AnnotationRouter {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_ANNOTATION, IdentityEncoding::default())
    }
}

impl IdentityRouter for AnnotationRouter {
    fn extract(&self, payload: &Value) -> Result<Identity, RoutingError> {
        let object = payload.as_object().ok_or(RoutingError::NotAnObject)?;

        let metadata = match object.get("metadata") {
            None | Some(Value::Null) => return Ok(Identity::Default),
            Some(Value::Object(metadata)) => metadata,
            Some(_) => return Err(RoutingError::FieldNotAnObject { field: "metadata" }),
        };
        let annotations = match metadata.get("annotations") {
            None | Some(Value::Null) => return Ok(Identity::Default),
            Some(Value::Object(annotations)) => annotations,
            Some(_) => {
                return Err(RoutingError::FieldNotAnObject {
                    field: "metadata.annotations",
                })
            }
        };
        let raw = match annotations.get(&self.key) {
            None | Some(Value::Null) => return Ok(Identity::Default),
            Some(Value::String(raw)) => raw,
            Some(_) => {
                return Err(RoutingError::NotAString {
                    key: self.key.clone(),
                })
            }
        };

        let name = self.decode(raw)?;
        if name.is_empty() {
            return Ok(Identity::Default);
        }
        Ok(Identity::Principal(name))
    }
}
