use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Local};
use futures::{Stream, StreamExt};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::utils::clock::Clock;

use super::{
    session::accumulator::SessionAccumulator,
    signals::{tabs::BrowserState, BrowserSignal, IdleState, WindowId},
    storage::ledger_store::LedgerStore,
    sweeper::RetentionSweeper,
};

/// Translates browser signals into accumulator calls. Signals, flush ticks and retention sweeps
/// are all handled from one loop, so they never interleave.
pub struct EventRouter<S, B> {
    accumulator: SessionAccumulator<S>,
    browser: B,
    sweeper: RetentionSweeper<S>,
    clock: Box<dyn Clock>,
    sweep_period: Duration,
    /// Whether any browser window has focus. Assumed until told otherwise.
    window_focused: bool,
}

impl<S: LedgerStore, B: BrowserState> EventRouter<S, B> {
    pub fn new(
        accumulator: SessionAccumulator<S>,
        browser: B,
        sweeper: RetentionSweeper<S>,
        clock: Box<dyn Clock>,
        sweep_period: Duration,
    ) -> Self {
        Self {
            accumulator,
            browser,
            sweeper,
            clock,
            sweep_period,
            window_focused: true,
        }
    }

    pub fn accumulator(&self) -> &SessionAccumulator<S> {
        &self.accumulator
    }

    /// Handles a single signal to completion.
    pub async fn dispatch(&mut self, signal: BrowserSignal) {
        debug!("Dispatching {signal:?}");
        self.browser.observe(&signal);
        let now = self.clock.time();

        match signal {
            BrowserSignal::Startup { .. } => {
                self.start_active_tab(None, now).await;
            }
            BrowserSignal::TabActivated { tab_id, .. } => {
                match self.browser.tab(tab_id).and_then(|tab| tab.url) {
                    Some(url) => {
                        self.accumulator.start(tab_id, Some(&*url), now).await;
                    }
                    None => debug!("Activated tab {tab_id} has no known url yet"),
                }
            }
            BrowserSignal::TabUpdated {
                tab_id,
                url: Some(url),
                ..
            } => {
                let tracked = self.accumulator.tracked_tab() == Some(tab_id);
                // Also starts tracking when nothing is tracked and this is the focused tab: a tab
                // leaving an untracked page (new tab, settings) has no session to follow.
                let focused_idle_tab = self.accumulator.tracked_tab().is_none()
                    && self.window_focused
                    && self.browser.active_tab(None).map(|tab| tab.tab_id) == Some(tab_id);
                if tracked || focused_idle_tab {
                    self.accumulator.start(tab_id, Some(&*url), now).await;
                }
            }
            BrowserSignal::TabUpdated { .. } => {}
            BrowserSignal::TabRemoved { tab_id } => {
                if self.accumulator.tracked_tab() == Some(tab_id) {
                    self.accumulator.stop(now).await;
                }
            }
            BrowserSignal::WindowFocusChanged { window_id } if window_id.is_none() => {
                self.window_focused = false;
                self.accumulator.stop(now).await;
            }
            BrowserSignal::WindowFocusChanged { window_id } => {
                self.window_focused = true;
                self.start_active_tab(Some(window_id), now).await;
            }
            BrowserSignal::IdleStateChanged { state } => {
                let active = state == IdleState::Active;
                self.accumulator.set_activity(active, now).await;
                if active && self.window_focused {
                    self.start_active_tab(None, now).await;
                }
            }
        }
    }

    async fn start_active_tab(&mut self, window: Option<WindowId>, now: DateTime<Local>) {
        match self.browser.active_tab(window) {
            Some(tab) => {
                self.accumulator
                    .start(tab.tab_id, tab.url.as_deref(), now)
                    .await;
            }
            None => debug!("No active tab found for {window:?}"),
        }
    }

    /// Executes the router event loop until the signal stream ends or shutdown is requested. The
    /// current session is always closed before returning.
    pub async fn run(
        mut self,
        mut signals: impl Stream<Item = Result<BrowserSignal>> + Unpin,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let mut sweep_timer = interval_at(Instant::now() + self.sweep_period, self.sweep_period);
        sweep_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut result = Ok(());
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                signal = signals.next() => match signal {
                    Some(Ok(signal)) => {
                        let span = info_span!("Handling browser signal");
                        self.dispatch(signal).instrument(span).await;
                    }
                    Some(Err(e)) => {
                        error!("Signal transport failed {e:?}");
                        result = Err(e);
                        break;
                    }
                    None => {
                        info!("Browser disconnected");
                        break;
                    }
                },
                _ = self.accumulator.next_tick() => {
                    let now = self.clock.time();
                    self.accumulator.on_tick(now).await;
                }
                _ = sweep_timer.tick() => {
                    if let Err(e) = self.sweeper.sweep(self.clock.today()).await {
                        error!("Retention sweep failed {e:?}");
                    }
                }
            }
        }

        let now = self.clock.time();
        self.accumulator.stop(now).await;
        result
    }
}
