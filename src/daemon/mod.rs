use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use router::EventRouter;
use session::{accumulator::SessionAccumulator, ExcludedPrefixes};
use signals::{
    native::{signal_stream, write_message, Framing},
    tabs::{BrowserState, TabMirror},
    HostMessage,
};
use storage::ledger_store::JsonFileStore;
use sweeper::{RetentionSweeper, DEFAULT_RETENTION_DAYS};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::utils::clock::{Clock, DefaultClock};

pub mod args;
pub mod router;
pub mod session;
pub mod shutdown;
pub mod signals;
pub mod storage;
pub mod sweeper;

const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_IDLE_DETECTION_SECONDS: u32 = 60;

/// Knobs of the tracking host.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub flush_interval: Duration,
    pub sweep_interval: Duration,
    pub retention_days: u32,
    /// Sent to the extension, which owns idle detection.
    pub idle_detection_seconds: u32,
    pub excluded: ExcludedPrefixes,
    pub framing: Framing,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            retention_days: DEFAULT_RETENTION_DAYS,
            idle_detection_seconds: DEFAULT_IDLE_DETECTION_SECONDS,
            excluded: ExcludedPrefixes::default(),
            framing: Framing::default(),
        }
    }
}

/// Represents the starting point for the native messaging host. The browser talks to it over
/// stdin/stdout.
pub async fn start_daemon(dir: PathBuf, config: TrackerConfig) -> Result<()> {
    serve(
        dir,
        config,
        tokio::io::stdin(),
        tokio::io::stdout(),
        DefaultClock,
    )
    .await
}

async fn serve(
    dir: PathBuf,
    config: TrackerConfig,
    reader: impl AsyncRead + Send + 'static,
    mut writer: impl AsyncWrite + Unpin,
    clock: impl Clock,
) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let router = create_router(dir, &config, TabMirror::new(), clock)?;

    write_message(
        &mut writer,
        &HostMessage::Configure {
            idle_detection_seconds: config.idle_detection_seconds,
        },
        config.framing,
    )
    .await
    .inspect_err(|e| error!("Couldn't configure the extension {e:?}"))?;
    info!("Host started, waiting for browser signals");

    let signals = signal_stream(reader, config.framing);
    let routing = async {
        let result = router.run(signals, shutdown_token.clone()).await;
        // Whatever ended routing also ends the signal watcher.
        shutdown_token.cancel();
        result
    };

    let (_, routing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        routing
    );

    if let Err(routing_result) = &routing_result {
        error!("Routing module got an error {:?}", routing_result);
    }

    routing_result
}

fn create_router<B: BrowserState>(
    dir: PathBuf,
    config: &TrackerConfig,
    browser: B,
    clock: impl Clock,
) -> Result<EventRouter<Arc<JsonFileStore>, B>> {
    let store = Arc::new(JsonFileStore::new(dir)?);
    let accumulator = SessionAccumulator::new(
        store.clone(),
        config.flush_interval,
        config.excluded.clone(),
    );
    let sweeper = RetentionSweeper::new(store, config.retention_days);
    Ok(EventRouter::new(
        accumulator,
        browser,
        sweeper,
        Box::new(clock),
        config.sweep_interval,
    ))
}

#[cfg(test)]
mod daemon_tests {
    use std::{
        io::Cursor,
        sync::{Arc, Mutex},
    };

    use anyhow::Result;
    use chrono::{DateTime, Local, NaiveDate};
    use tempfile::tempdir;

    use crate::{
        daemon::{
            serve,
            signals::native::Framing,
            storage::{
                entities::DateKey,
                ledger_store::{JsonFileStore, LedgerStore},
            },
            TrackerConfig,
        },
        utils::{
            clock::{test_clock::local_time, Clock},
            logging::TEST_LOGGING,
        },
    };

    /// Moves ten seconds forward every time it is read.
    #[derive(Clone)]
    struct SteppingClock {
        now: Arc<Mutex<DateTime<Local>>>,
    }

    impl Clock for SteppingClock {
        fn time(&self) -> DateTime<Local> {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::seconds(10);
            *now
        }
    }

    /// Smoke test of the whole host: configure message out, signals in, time in the ledger.
    #[tokio::test]
    async fn smoke_test_host() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let input = [
            r#"{"type":"startup","tabs":[{"tabId":1,"windowId":1,"url":"https://example.com/","active":true}],"focusedWindow":1}"#,
            r#"{"type":"windowFocusChanged","windowId":-1}"#,
            "this line is garbage",
            r#"{"type":"tabActivated","tabId":1,"windowId":1}"#,
        ]
        .join("\n");
        let mut output = Vec::new();
        let clock = SteppingClock {
            now: Arc::new(Mutex::new(local_time((2018, 7, 4), (12, 0, 0)))),
        };

        serve(
            dir.path().to_owned(),
            TrackerConfig {
                framing: Framing::Lines,
                ..TrackerConfig::default()
            },
            Cursor::new(input.into_bytes()),
            &mut output,
            clock,
        )
        .await?;

        assert_eq!(
            String::from_utf8(output)?,
            "{\"type\":\"configure\",\"idleDetectionSeconds\":60}\n"
        );

        let ledger = JsonFileStore::new(dir.path().to_owned())?.get(None).await?;
        let day = DateKey::from(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap());
        // Startup at +10s, focus lost at +20s, then the re-activated tab is closed out at +40s.
        assert_eq!(ledger.seconds("example.com", &day), 20);
        Ok(())
    }
}
