pub mod manifest;
pub mod output;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use manifest::{process_manifest_command, ManifestCommand};
use report::{process_today_command, process_week_command, TodayCommand, WeekCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{
        signals::native::Framing,
        start_daemon,
        storage::ledger_store::{JsonFileStore, LedgerStore},
        sweeper::{RetentionSweeper, DEFAULT_RETENTION_DAYS},
        TrackerConfig,
    },
    utils::{
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Sitewatch", version, long_about = None)]
#[command(about = "Shows how much time you spend on each website", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to use $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Time per site for today, or another day")]
    Today {
        #[command(flatten)]
        command: TodayCommand,
    },
    #[command(about = "Heatmap of the last 7 days with per-site totals")]
    Week {
        #[command(flatten)]
        command: WeekCommand,
    },
    #[command(about = "Remove recorded days that fell out of the retention window")]
    Sweep {
        #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS)]
        retention_days: u32,
    },
    #[command(about = "Delete all recorded time")]
    Reset {
        #[arg(long, help = "Confirm that everything should be deleted")]
        yes: bool,
    },
    #[command(
        about = "Run the host directly in current console. Feed it browser signals for debugging"
    )]
    Serve {
        #[arg(long, value_enum, default_value_t = Framing::Lines)]
        framing: Framing,
    },
    #[command(about = "Print the native messaging manifest for the browser")]
    Manifest {
        #[command(flatten)]
        command: ManifestCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    match args.commands {
        Commands::Today { command } => process_today_command(&app_dir, command).await,
        Commands::Week { command } => process_week_command(&app_dir, command).await,
        Commands::Sweep { retention_days } => sweep(&app_dir, retention_days).await,
        Commands::Reset { yes } => reset(&app_dir, yes).await,
        Commands::Serve { framing } => {
            start_daemon(
                app_dir,
                TrackerConfig {
                    framing,
                    ..TrackerConfig::default()
                },
            )
            .await
        }
        Commands::Manifest { command } => process_manifest_command(command),
    }
}

async fn sweep(dir: &Path, retention_days: u32) -> Result<()> {
    let store = JsonFileStore::new(dir.to_owned())?;
    let report = RetentionSweeper::new(&store, retention_days)
        .sweep(Local::now().date_naive())
        .await?;
    if report.is_noop() {
        println!("Nothing to remove");
    } else {
        println!(
            "Removed {} days and {} sites, kept {} sites",
            report.removed_days, report.removed_domains, report.kept_domains
        );
    }
    Ok(())
}

async fn reset(dir: &Path, confirmed: bool) -> Result<()> {
    if !confirmed {
        println!("This deletes all recorded time. Run again with --yes to confirm");
        return Ok(());
    }
    JsonFileStore::new(dir.to_owned())?.clear().await?;
    println!("All recorded time deleted");
    Ok(())
}
