// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod payload;
pub mod recording;
pub mod run_lanepoold;
pub mod test_log;

/// Routes the pool's log output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
    log::debug!("test logging initialized");
}
