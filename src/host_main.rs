use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use sitewatch::{
    daemon::{args::HostArgs, start_daemon},
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, HOST_PREFIX},
        runtime::single_thread_runtime,
    },
};
use tracing::error;

/// Reading stdin parks a blocking thread that never returns on its own.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let args = HostArgs::parse();
    let app_dir = args.dir.clone().map_or_else(create_application_default_path, Ok)?;
    enable_logging(HOST_PREFIX, &app_dir.join("logs"), args.log, args.log_console)?;

    let config = args.tracker_config();
    let runtime = single_thread_runtime()?;
    let result = runtime
        .block_on(start_daemon(app_dir, config))
        .inspect_err(|e| error!("Host stopped with an error {e:?}"));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}
