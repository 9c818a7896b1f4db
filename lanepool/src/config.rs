// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::time::Duration;

use log::{info, warn};

use crate::identity::{IdentityEncoding, DEFAULT_IDENTITY_ANNOTATION};

pub const ENV_POOL_SIZE: &str = "LANEPOOL_POOL_SIZE";
pub const ENV_LANE_IDLE_TIMEOUT_SECS: &str = "LANEPOOL_LANE_IDLE_TIMEOUT_SECS";
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "LANEPOOL_SHUTDOWN_TIMEOUT_SECS";
pub const ENV_IDENTITY_ANNOTATION: &str = "LANEPOOL_IDENTITY_ANNOTATION";

pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings of a [`DispatchPool`](crate::dispatch::DispatchPool).
///
/// `pool_size` is both the number of default workers and the capacity of
/// every queue, default and lane alike.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub pool_size: usize,
    /// Lanes without pending jobs for this long are removed. `None` keeps
    /// lanes for the lifetime of the pool.
    pub lane_idle_timeout: Option<Duration>,
    /// How long shutdown waits for workers to drain their queues.
    pub shutdown_timeout: Duration,
    pub identity_annotation: String,
    pub identity_encoding: IdentityEncoding,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            lane_idle_timeout: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            identity_annotation: DEFAULT_IDENTITY_ANNOTATION.to_string(),
            identity_encoding: IdentityEncoding::default(),
        }
    }
}

impl PoolConfig {
    /// A default config with the given pool size. A size of 0 falls back to
    /// [`DEFAULT_POOL_SIZE`].
    pub fn new(pool_size: usize) -> Self {
        Self::default().with_pool_size(pool_size)
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = if pool_size == 0 {
            warn!(
                "pool size must be at least 1, using default value {}",
                DEFAULT_POOL_SIZE
            );
            DEFAULT_POOL_SIZE
        } else {
            pool_size
        };
        self
    }

    pub fn with_lane_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lane_idle_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_identity_annotation(mut self, key: impl Into<String>) -> Self {
        self.identity_annotation = key.into();
        self
    }

    pub fn with_identity_encoding(mut self, encoding: IdentityEncoding) -> Self {
        self.identity_encoding = encoding;
        self
    }

    /// Resolves the config from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the config through `lookup`, which maps a variable name to its
    /// value. Invalid values fall back to their defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            pool_size: parse_pool_size(lookup(ENV_POOL_SIZE).as_deref()),
            ..Self::default()
        };
        if let Some(raw) = lookup(ENV_LANE_IDLE_TIMEOUT_SECS) {
            config.lane_idle_timeout = parse_secs(ENV_LANE_IDLE_TIMEOUT_SECS, &raw);
        }
        if let Some(raw) = lookup(ENV_SHUTDOWN_TIMEOUT_SECS) {
            if let Some(timeout) = parse_secs(ENV_SHUTDOWN_TIMEOUT_SECS, &raw) {
                config.shutdown_timeout = timeout;
            }
        }
        if let Some(key) = lookup(ENV_IDENTITY_ANNOTATION) {
            if key.trim().is_empty() {
                warn!(
                    "env var {} is empty, using default value {}",
                    ENV_IDENTITY_ANNOTATION, DEFAULT_IDENTITY_ANNOTATION
                );
            } else {
                config.identity_annotation = key.trim().to_string();
            }
        }
        config
    }
}

/// Resolves the raw pool size setting.
///
/// Missing values use [`DEFAULT_POOL_SIZE`] with a notice; values that are not
/// a positive integer use it with a warning.
pub fn parse_pool_size(raw: Option<&str>) -> usize {
    let Some(raw) = raw else {
        info!(
            "env variable {} not found, using default value {}",
            ENV_POOL_SIZE, DEFAULT_POOL_SIZE
        );
        return DEFAULT_POOL_SIZE;
    };

    match raw.trim().parse::<i64>() {
        Ok(value) if value >= 1 => value as usize,
        _ => {
            warn!(
                "env var {} invalid value: {:?}, using default value {}",
                ENV_POOL_SIZE, raw, DEFAULT_POOL_SIZE
            );
            DEFAULT_POOL_SIZE
        }
    }
}

fn parse_secs(key: &str, raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
        _ => {
            warn!("env var {} invalid value: {:?}, ignoring it", key, raw);
            None
        }
    }
}
