//! The active-session time accumulator. A session is one contiguous stretch of focus on a single
//! domain; [accumulator::SessionAccumulator] turns it into per-day seconds in the ledger.

pub mod accumulator;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;
use url::Url;

use super::signals::TabId;

/// Bucket for URLs that have no usable host.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Browser internal pages that are never tracked.
pub const DEFAULT_EXCLUDED_PREFIXES: [&str; 3] = ["chrome://", "edge://", "about:"];

/// Hostname of `url`, or [UNKNOWN_DOMAIN] when it can't be parsed or carries no host.
pub fn extract_domain(url: &str) -> Arc<str> {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => host.into(),
            _ => UNKNOWN_DOMAIN.into(),
        },
        Err(e) => {
            debug!("Couldn't parse {url}: {e}");
            UNKNOWN_DOMAIN.into()
        }
    }
}

/// URL prefixes that keep the accumulator idle.
#[derive(Debug, Clone)]
pub struct ExcludedPrefixes(Vec<String>);

impl ExcludedPrefixes {
    pub fn new(prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(prefixes.into_iter().map(Into::into).collect())
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.0.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }
}

impl Default for ExcludedPrefixes {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_PREFIXES)
    }
}

/// The currently tracked session. Owns its flush timer, so leaving the tracking state always
/// disarms it.
#[derive(Debug)]
pub struct Session {
    tab_id: TabId,
    domain: Arc<str>,
    started_at: DateTime<Local>,
    ticker: Interval,
}

impl Session {
    fn new(tab_id: TabId, domain: Arc<str>, started_at: DateTime<Local>, period: Duration) -> Self {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            tab_id,
            domain,
            started_at,
            ticker,
        }
    }

    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_domain, ExcludedPrefixes, UNKNOWN_DOMAIN};

    #[test]
    fn test_extract_domain() {
        assert_eq!(&*extract_domain("https://www.example.com/a?b=c"), "www.example.com");
        assert_eq!(&*extract_domain("http://localhost:8080/"), "localhost");
        assert_eq!(&*extract_domain("not a url"), UNKNOWN_DOMAIN);
        assert_eq!(&*extract_domain("file:///home/user/notes.txt"), UNKNOWN_DOMAIN);
    }

    #[test]
    fn test_default_exclusions() {
        let excluded = ExcludedPrefixes::default();
        assert!(excluded.is_excluded("chrome://extensions"));
        assert!(excluded.is_excluded("edge://settings"));
        assert!(excluded.is_excluded("about:blank"));
        assert!(!excluded.is_excluded("https://chrome.google.com/"));
    }
}
