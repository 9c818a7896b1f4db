// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};

use serde_json::Value;

pub struct LanepooldOutput {
    pub status: ExitStatus,
    /// The store printed by `--print-store`, one object per line.
    pub store: Vec<Value>,
    pub stderr: String,
}

impl LanepooldOutput {
    pub fn applied_by(&self, key: &str) -> Option<Option<String>> {
        self.store
            .iter()
            .find(|o| o["key"] == key)
            .map(|o| o["applied_by"].as_str().map(str::to_string))
    }
}

/// Runs `lanepoold` located via cargo run, feeding `input` on stdin.
pub fn run_lanepoold(args: &[&str], input: &str) -> LanepooldOutput {
    println!("Executing lanepoold located via cargo run");
    let mut child = Command::new("cargo")
        .args(["run", "-q", "-p", "lanepool", "--bin", "lanepoold", "--", "--print-store"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start lanepoold");

    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("failed to write job requests");

    let out = child.wait_with_output().expect("failed to wait for lanepoold");
    let store = String::from_utf8_lossy(&out.stdout)
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).expect("store line is not JSON"))
        .collect();

    LanepooldOutput {
        status: out.status,
        store,
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
    }
}
