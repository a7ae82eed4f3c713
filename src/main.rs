use std::time::Duration;

use anyhow::Result;
use sitewatch::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

/// `serve` leaves a blocking stdin reader behind.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_cli()).inspect_err(|e| {
        error!("Error running cli {e:?}");
    });
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}
