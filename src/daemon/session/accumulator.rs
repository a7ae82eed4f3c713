use std::{future, time::Duration};

use chrono::{DateTime, Local};
use tracing::{debug, error, info};

use crate::{
    daemon::{
        signals::TabId,
        storage::{entities::DateKey, ledger_store::LedgerStore},
    },
    utils::time::elapsed_seconds,
};

use super::{extract_domain, ExcludedPrefixes, Session};

/// Tracks one viewing session at a time and records its elapsed wall-clock time into the ledger.
///
/// The accumulator is either idle (no session) or tracking. Time is written on every flush, so at
/// most one flush period is lost if the process dies.
pub struct SessionAccumulator<S> {
    store: S,
    session: Option<Session>,
    is_active: bool,
    flush_period: Duration,
    excluded: ExcludedPrefixes,
}

impl<S: LedgerStore> SessionAccumulator<S> {
    pub fn new(store: S, flush_period: Duration, excluded: ExcludedPrefixes) -> Self {
        Self {
            store,
            session: None,
            is_active: true,
            flush_period,
            excluded,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn tracked_tab(&self) -> Option<TabId> {
        self.session.as_ref().map(Session::tab_id)
    }

    pub fn tracked_domain(&self) -> Option<&str> {
        self.session.as_ref().map(Session::domain)
    }

    /// Starts a session for `url` in `tab_id`. An ongoing session is always flushed and closed
    /// first. Returns whether a new session is being tracked.
    pub async fn start(&mut self, tab_id: TabId, url: Option<&str>, now: DateTime<Local>) -> bool {
        self.stop(now).await;

        let Some(url) = url else {
            debug!("Tab {tab_id} has no url, staying idle");
            return false;
        };
        if self.excluded.is_excluded(url) {
            debug!("Not tracking excluded url {url}");
            return false;
        }
        if !self.is_active {
            debug!("User is inactive, not tracking tab {tab_id}");
            return false;
        }

        let domain = extract_domain(url);
        info!("Tracking {domain} in tab {tab_id}");
        self.session = Some(Session::new(tab_id, domain, now, self.flush_period));
        true
    }

    /// Final flush of the current session, then back to idle.
    pub async fn stop(&mut self, now: DateTime<Local>) {
        if self.session.is_none() {
            return;
        }
        self.flush(now).await;
        if let Some(session) = self.session.take() {
            info!(
                "Stopped tracking {} in tab {}",
                session.domain, session.tab_id
            );
        }
    }

    /// Becoming inactive ends the session. Becoming active doesn't start one by itself, the caller
    /// has to resolve the focused tab again.
    pub async fn set_activity(&mut self, active: bool, now: DateTime<Local>) {
        if self.is_active != active {
            info!("User is now {}", if active { "active" } else { "inactive" });
        }
        self.is_active = active;
        if !active {
            self.stop(now).await;
        }
    }

    /// Writes whole seconds elapsed since the session start (or the previous flush) into today's
    /// bucket. Less than a second is a no-op that leaves the start untouched. Returns the number
    /// of seconds flushed.
    pub async fn flush(&mut self, now: DateTime<Local>) -> u64 {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let elapsed = elapsed_seconds(&session.started_at, &now);
        if elapsed < 1 {
            return 0;
        }
        // Sub-second remainder is dropped, not carried over.
        session.started_at = now;
        let domain = session.domain.clone();

        let day = DateKey::from(now.date_naive());
        match self.store.add(&domain, day.clone(), elapsed).await {
            Ok(total) => debug!("Added {elapsed}s to {domain} on {day}, now {total}s"),
            Err(e) => error!("Failed to persist {elapsed}s for {domain} on {day}: {e:?}"),
        }
        elapsed
    }

    /// Resolves on the next tick of the session's flush timer. Never resolves while idle.
    pub async fn next_tick(&mut self) {
        match self.session.as_mut() {
            Some(session) => {
                session.ticker.tick().await;
            }
            None => future::pending().await,
        }
    }

    /// Periodic flush, driven by [Self::next_tick].
    pub async fn on_tick(&mut self, now: DateTime<Local>) {
        if self.is_active && self.session.is_some() {
            self.flush(now).await;
        }
    }
}
