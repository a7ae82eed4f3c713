use std::{
    collections::BTreeMap,
    fmt::Display,
    sync::Arc,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::utils::time::date_to_key;

/// Calendar day identifier in `YYYY-MM-DD` form. Ordering is plain string ordering, which matches
/// calendar ordering because the format is fixed width and zero padded.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(Arc<str>);

impl DateKey {
    /// Keys written by something other than this crate may not be valid dates.
    pub fn to_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.0, "%Y-%m-%d").ok()
    }
}

impl From<NaiveDate> for DateKey {
    fn from(value: NaiveDate) -> Self {
        DateKey(date_to_key(value).into())
    }
}

impl From<&str> for DateKey {
    fn from(value: &str) -> Self {
        DateKey(value.into())
    }
}

impl Display for DateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seconds spent on one domain, per day.
pub type DomainDays = BTreeMap<DateKey, u64>;

/// The persisted domain → date → seconds accumulation structure.
#[derive(PartialEq, Eq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeLedger(BTreeMap<Arc<str>, DomainDays>);

impl TimeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seconds(&self, domain: &str, date: &DateKey) -> u64 {
        self.0
            .get(domain)
            .and_then(|days| days.get(date))
            .copied()
            .unwrap_or(0)
    }

    /// Adds `seconds` to the (domain, date) pair, creating nested entries as needed.
    pub fn add(&mut self, domain: &str, date: DateKey, seconds: u64) -> u64 {
        let total = self
            .0
            .entry(Arc::from(domain))
            .or_default()
            .entry(date)
            .or_insert(0);
        *total = total.saturating_add(seconds);
        *total
    }

    pub fn domains(&self) -> impl Iterator<Item = (&Arc<str>, &DomainDays)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Arc<str>, DomainDays)> for TimeLedger {
    fn from_iter<T: IntoIterator<Item = (Arc<str>, DomainDays)>>(iter: T) -> Self {
        TimeLedger(iter.into_iter().collect())
    }
}

impl IntoIterator for TimeLedger {
    type Item = (Arc<str>, DomainDays);
    type IntoIter = std::collections::btree_map::IntoIter<Arc<str>, DomainDays>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// What a retention sweep removed from the ledger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed_days: usize,
    pub removed_domains: usize,
    pub kept_domains: usize,
}

impl SweepReport {
    pub fn is_noop(&self) -> bool {
        self.removed_days == 0 && self.removed_domains == 0
    }
}
