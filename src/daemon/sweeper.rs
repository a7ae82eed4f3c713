use anyhow::Result;
use chrono::{Duration, NaiveDate};
use tracing::{debug, info};

use super::storage::{
    entities::{DateKey, SweepReport},
    ledger_store::LedgerStore,
};

pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// First day that is still kept.
pub fn retention_cutoff(today: NaiveDate, retention_days: u32) -> DateKey {
    today
        .checked_sub_signed(Duration::days(retention_days as i64))
        .unwrap_or(NaiveDate::MIN)
        .into()
}

/// Drops ledger entries that fell out of the retention window.
pub struct RetentionSweeper<S> {
    store: S,
    retention_days: u32,
}

impl<S: LedgerStore> RetentionSweeper<S> {
    pub fn new(store: S, retention_days: u32) -> Self {
        Self {
            store,
            retention_days,
        }
    }

    /// Removes days before the retention cutoff in one store update. Keys that are not tracked
    /// domains stay untouched, and nothing is written when there is nothing to remove.
    pub async fn sweep(&self, today: NaiveDate) -> Result<SweepReport> {
        let cutoff = retention_cutoff(today, self.retention_days);
        let report = self.store.prune_before(&cutoff).await?;

        if report.is_noop() {
            debug!("Nothing older than {cutoff} to sweep");
            return Ok(report);
        }

        info!(
            "Swept ledger before {cutoff}: removed {} days and {} domains, kept {} domains",
            report.removed_days, report.removed_domains, report.kept_domains
        );
        Ok(report)
    }
}
