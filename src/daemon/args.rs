use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::{
    signals::native::Framing, sweeper::DEFAULT_RETENTION_DAYS, TrackerConfig,
    DEFAULT_IDLE_DETECTION_SECONDS,
};

/// Arguments of the native messaging host. Browsers launch it themselves, so every option has a
/// usable default.
#[derive(Parser)]
pub struct HostArgs {
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Mirrors log lines to stderr. This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    #[arg(long, value_enum, default_value_t = Framing::Native)]
    pub framing: Framing,
    /// Seconds without input before the browser reports the user as idle.
    #[arg(long = "idle-seconds", default_value_t = DEFAULT_IDLE_DETECTION_SECONDS)]
    pub idle_seconds: u32,
    #[arg(long = "retention-days", default_value_t = DEFAULT_RETENTION_DAYS)]
    pub retention_days: u32,
    /// Chrome windows handle, passed on Windows only.
    #[arg(long = "parent-window", hide = true)]
    pub parent_window: Option<i64>,
    /// Caller origin (Chrome) or manifest path and extension id (Firefox).
    #[arg(hide = true)]
    pub caller: Vec<String>,
}

impl HostArgs {
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            retention_days: self.retention_days,
            idle_detection_seconds: self.idle_seconds,
            framing: self.framing,
            ..TrackerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use crate::daemon::signals::native::Framing;

    use super::HostArgs;

    #[test]
    fn test_browser_launch_arguments_are_accepted() {
        let args = HostArgs::parse_from([
            "sitewatch-host",
            "chrome-extension://abcdefghijklmnop/",
            "--parent-window=42",
        ]);
        assert_eq!(args.caller, vec!["chrome-extension://abcdefghijklmnop/"]);
        assert_eq!(args.framing, Framing::Native);

        let config = args.tracker_config();
        assert_eq!(config.retention_days, 30);
        assert_eq!(config.idle_detection_seconds, 60);
    }

    #[test]
    fn test_overrides() {
        let args = HostArgs::parse_from([
            "sitewatch-host",
            "--framing",
            "lines",
            "--idle-seconds",
            "120",
            "--retention-days",
            "7",
        ]);
        let config = args.tracker_config();
        assert_eq!(config.framing, Framing::Lines);
        assert_eq!(config.idle_detection_seconds, 120);
        assert_eq!(config.retention_days, 7);
    }
}
