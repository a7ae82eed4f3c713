use std::sync::Arc;

use crate::daemon::storage::entities::{DateKey, TimeLedger};

/// How many sites the today view shows unless asked otherwise.
pub const DEFAULT_TOP_SITES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTime {
    pub domain: Arc<str>,
    pub seconds: u64,
}

/// Time spent on the web on a single day.
#[derive(Debug)]
pub struct TodaySummary {
    pub date: DateKey,
    /// Sum over every domain, not only the listed ones.
    pub total_seconds: u64,
    pub sites: Vec<SiteTime>,
}

/// Orders sites by time spent, longest first. Equal times fall back to the domain name so the
/// output is stable.
pub fn rank_sites(sites: &mut [SiteTime]) {
    sites.sort_by(|a, b| b.seconds.cmp(&a.seconds).then_with(|| a.domain.cmp(&b.domain)));
}

/// Returns the `top` domains with time recorded on `date` plus the day's total.
pub fn today_view(ledger: &TimeLedger, date: &DateKey, top: usize) -> TodaySummary {
    let mut sites = ledger
        .domains()
        .map(|(domain, days)| SiteTime {
            domain: domain.clone(),
            seconds: days.get(date).copied().unwrap_or(0),
        })
        .filter(|site| site.seconds > 0)
        .collect::<Vec<_>>();

    let total_seconds = sites.iter().map(|site| site.seconds).sum();
    rank_sites(&mut sites);
    sites.truncate(top);

    TodaySummary {
        date: date.clone(),
        total_seconds,
        sites,
    }
}
