// SPDX-License-Identifier: MIT
// lanepoold: identity-aware job dispatch daemon
//
// - Reads job requests (one JSON document per line) from stdin or a file.
// - Applies/deletes objects in an in-memory store, each principal on its own lane.
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use lanepool::config::{
    parse_pool_size, DEFAULT_SHUTDOWN_TIMEOUT, ENV_IDENTITY_ANNOTATION,
    ENV_LANE_IDLE_TIMEOUT_SECS, ENV_POOL_SIZE, ENV_SHUTDOWN_TIMEOUT_SECS,
};
use lanepool::identity::DEFAULT_IDENTITY_ANNOTATION;
use lanepool::jobs::{Handlers, JobRequest, ResourceStore, StoreSessionFactory};
use lanepool::{CancellationSignal, DispatchPool, IdentityEncoding, PoolConfig};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Number of default workers and capacity of every queue
    #[arg(long, env = ENV_POOL_SIZE, value_name = "N")]
    pool_size: Option<String>,

    /// Evict lanes that had no jobs for this many seconds (disabled if unset)
    #[arg(long, env = ENV_LANE_IDLE_TIMEOUT_SECS, value_name = "SECS")]
    lane_idle_timeout_secs: Option<u64>,

    /// How long to wait for workers to drain their queues on shutdown
    #[arg(long, env = ENV_SHUTDOWN_TIMEOUT_SECS, value_name = "SECS")]
    shutdown_timeout_secs: Option<u64>,

    /// Annotation that carries the principal identity of a job
    #[arg(long, env = ENV_IDENTITY_ANNOTATION, default_value = DEFAULT_IDENTITY_ANNOTATION)]
    identity_annotation: String,

    /// Encoding of the identity annotation value
    #[arg(long, value_enum, default_value_t)]
    identity_encoding: IdentityEncoding,

    /// Read job requests from this file instead of stdin
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Reject sessions for this identity (may be repeated)
    #[arg(long = "deny-identity", value_name = "IDENTITY")]
    deny_identity: Vec<String>,

    /// Print the resulting store as JSON lines to stdout
    #[arg(long)]
    print_store: bool,
}

fn validate_args(args: &Args) -> Result<(), String> {
    if args.lane_idle_timeout_secs == Some(0) {
        return Err("--lane-idle-timeout-secs must be greater than 0".into());
    }
    if args.shutdown_timeout_secs == Some(0) {
        return Err("--shutdown-timeout-secs must be greater than 0".into());
    }
    if args.identity_annotation.trim().is_empty() {
        return Err("--identity-annotation must not be empty".into());
    }
    Ok(())
}

fn pool_config(args: &Args) -> PoolConfig {
    PoolConfig::new(parse_pool_size(args.pool_size.as_deref()))
        .with_lane_idle_timeout(args.lane_idle_timeout_secs.map(Duration::from_secs))
        .with_shutdown_timeout(
            args.shutdown_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
        )
        .with_identity_annotation(args.identity_annotation.trim())
        .with_identity_encoding(args.identity_encoding)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {e}");
        std::process::exit(2);
    }

    if let Err(e) = run(args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let store = ResourceStore::new();
    let factory = StoreSessionFactory::new(store.clone()).deny(args.deny_identity.iter().cloned());
    let config = pool_config(&args);
    info!("Starting lanepoold with {} default workers", config.pool_size);

    let pool = Arc::new(
        DispatchPool::with_annotation_router(config, factory)
            .context("failed to create the dispatch pool")?,
    );
    let signal = CancellationSignal::new();
    let runner = {
        let pool = Arc::clone(&pool);
        let signal = signal.clone();
        thread::Builder::new()
            .name("lanepool-pool".into())
            .spawn(move || pool.start(&signal))
            .context("failed to start the dispatch pool")?
    };

    let handlers = Handlers::default();
    let mut read_error = None;
    for (line_no, line) in input.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                read_error = Some(e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match JobRequest::parse(&line) {
            Ok(request) => pool.submit(request.into_job(&handlers)),
            Err(e) => warn!("Skipping line {}: invalid job request: {}", line_no + 1, e),
        }
    }

    info!("End of input, stopping lanepoold");
    signal.cancel();
    match runner.join() {
        Ok(result) => result.context("dispatch pool failed")?,
        Err(_) => anyhow::bail!("dispatch pool thread panicked"),
    }
    if let Some(e) = read_error {
        return Err(e).context("failed to read job requests");
    }

    if args.print_store {
        for object in store.snapshot() {
            println!("{}", serde_json::to_string(&object)?);
        }
    }
    Ok(())
}
