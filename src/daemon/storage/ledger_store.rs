use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Result};
use fs4::tokio::AsyncFileExt;
use serde_json::{Map, Value};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, warn};

use super::entities::{DateKey, DomainDays, SweepReport, TimeLedger};

pub const LEDGER_FILE_NAME: &str = "ledger.json";
const LOCK_FILE_NAME: &str = "ledger.lock";
const TEMP_FILE_NAME: &str = "ledger.json.tmp";

type RawLedger = Map<String, Value>;

/// Key-value persistence for the [TimeLedger]. Keys are domains, values are the per-day counters
/// of that domain.
pub trait LedgerStore {
    /// Reads the requested domains, or the whole ledger when `domains` is `None`. Missing domains
    /// are simply absent from the result.
    fn get(&self, domains: Option<&[&str]>) -> impl Future<Output = Result<TimeLedger>>;

    /// Replaces the stored value of every domain present in `entries`. Other keys are untouched.
    fn set(&self, entries: TimeLedger) -> impl Future<Output = Result<()>>;

    /// Removes everything.
    fn clear(&self) -> impl Future<Output = Result<()>>;

    /// Adds `seconds` to a single (domain, day) counter and returns its new value. Nothing else
    /// in the ledger changes.
    fn add(&self, domain: &str, day: DateKey, seconds: u64) -> impl Future<Output = Result<u64>>;

    /// Removes day entries older than `cutoff` and the domains left without days. Keys that are
    /// not domain entries stay as they are.
    fn prune_before(&self, cutoff: &DateKey) -> impl Future<Output = Result<SweepReport>>;
}

impl<T: Deref> LedgerStore for T
where
    T::Target: LedgerStore,
{
    fn get(&self, domains: Option<&[&str]>) -> impl Future<Output = Result<TimeLedger>> {
        self.deref().get(domains)
    }

    fn set(&self, entries: TimeLedger) -> impl Future<Output = Result<()>> {
        self.deref().set(entries)
    }

    fn clear(&self) -> impl Future<Output = Result<()>> {
        self.deref().clear()
    }

    fn add(&self, domain: &str, day: DateKey, seconds: u64) -> impl Future<Output = Result<u64>> {
        self.deref().add(domain, day, seconds)
    }

    fn prune_before(&self, cutoff: &DateKey) -> impl Future<Output = Result<SweepReport>> {
        self.deref().prune_before(cutoff)
    }
}

/// The main realization of [LedgerStore]: one JSON object in a file.
///
/// Readers and writers coordinate through advisory locks on a sibling lock file, so the CLI can
/// read while the host is writing. The ledger itself is only ever replaced by renaming a fully
/// written temporary file over it, so an interrupted write never leaves it truncated.
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    temp_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            path: dir.join(LEDGER_FILE_NAME),
            lock_path: dir.join(LOCK_FILE_NAME),
            temp_path: dir.join(TEMP_FILE_NAME),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open_lock(&self) -> Result<File, std::io::Error> {
        File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .await
    }

    async fn read_raw(&self) -> Result<RawLedger> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RawLedger::new()),
            Err(e) => Err(e)?,
        };
        if content.trim().is_empty() {
            return Ok(RawLedger::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(raw) => Ok(raw),
            _ => Err(anyhow!("Ledger {:?} does not hold a JSON object", self.path)),
        }
    }

    async fn write_raw(&self, raw: &RawLedger) -> Result<()> {
        let buffer = serde_json::to_vec(raw)?;
        let mut file = File::create(&self.temp_path).await?;
        file.write_all(&buffer).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&self.temp_path, &self.path).await?;
        Ok(())
    }

    /// Runs a read-modify-write cycle under an exclusive lock. The ledger is only rewritten when
    /// `modify` succeeded and changed something.
    async fn update<T>(&self, modify: impl FnOnce(&mut RawLedger) -> Result<T>) -> Result<T> {
        let lock = self.open_lock().await?;
        // Semi-safe acquire-release for a file
        lock.lock_exclusive()?;
        let result = async {
            let mut raw = self.read_raw().await?;
            let before = raw.clone();
            let output = modify(&mut raw)?;
            if raw != before {
                self.write_raw(&raw).await?;
            }
            anyhow::Ok(output)
        }
        .await;
        lock.unlock_async().await?;
        result
    }

    async fn read_shared(&self) -> Result<RawLedger> {
        let lock = self.open_lock().await?;
        lock.lock_shared()?;
        let result = self.read_raw().await;
        lock.unlock_async().await?;
        result
    }
}

/// Converts the raw value stored under `key` into per-day counters. Keys that don't have the
/// domain shape (for example a version tag) are skipped, as are single days holding something
/// other than a counter.
fn parse_domain(key: &str, value: &Value) -> Option<DomainDays> {
    let Value::Object(raw_days) = value else {
        debug!("Skipping ledger key {key} that is not a domain entry");
        return None;
    };
    let days = raw_days
        .iter()
        .filter_map(|(day, seconds)| {
            let day = DateKey::from(day.as_str());
            match (day.to_date(), seconds.as_u64()) {
                (Some(_), Some(seconds)) => Some((day, seconds)),
                _ => {
                    warn!("Skipping ledger entry {key}/{day} holding {seconds}");
                    None
                }
            }
        })
        .collect::<DomainDays>();
    (!days.is_empty()).then_some(days)
}

/// Adds to `raw[domain][day]`, refusing to overwrite values that are not counters.
fn add_seconds(raw: &mut RawLedger, domain: &str, day: &DateKey, seconds: u64) -> Result<u64> {
    let entry = raw
        .entry(domain.to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    let days = match entry {
        Value::Object(days) => days,
        other => {
            return Err(anyhow!(
                "Ledger key {domain} holds {other}, refusing to overwrite it"
            ))
        }
    };
    let counter = days.entry(day.to_string()).or_insert(Value::from(0u64));
    let current = match counter.as_u64() {
        Some(current) => current,
        None => {
            return Err(anyhow!(
                "Ledger entry {domain}/{day} holds {counter}, refusing to overwrite it"
            ))
        }
    };
    let total = current.saturating_add(seconds);
    *counter = Value::from(total);
    Ok(total)
}

/// Drops day keys before `cutoff` from every domain entry. Only keys that are dates count as
/// days; objects without any are left alone.
fn prune_raw(raw: &mut RawLedger, cutoff: &DateKey) -> SweepReport {
    let mut report = SweepReport::default();
    raw.retain(|_, value| {
        let Value::Object(days) = value else {
            return true;
        };
        let before = days.len();
        let mut is_domain = false;
        days.retain(|day, _| {
            let day = DateKey::from(day.as_str());
            if day.to_date().is_none() {
                return true;
            }
            is_domain = true;
            &day >= cutoff
        });
        report.removed_days += before - days.len();

        if !is_domain {
            true
        } else if days.is_empty() {
            report.removed_domains += 1;
            false
        } else {
            report.kept_domains += 1;
            true
        }
    });
    report
}

impl LedgerStore for JsonFileStore {
    async fn get(&self, domains: Option<&[&str]>) -> Result<TimeLedger> {
        let raw = self.read_shared().await?;
        let wanted = |key: &str| {
            domains.map_or(true, |domains| domains.iter().any(|domain| *domain == key))
        };

        let ledger = raw
            .iter()
            .filter(|(key, _)| wanted(key))
            .filter_map(|(key, value)| {
                parse_domain(key, value).map(|days| (Arc::<str>::from(key.as_str()), days))
            })
            .collect::<TimeLedger>();
        debug!("Read {} domains from {:?}", ledger.len(), self.path);
        Ok(ledger)
    }

    async fn set(&self, entries: TimeLedger) -> Result<()> {
        let updates = entries
            .into_iter()
            .map(|(domain, days)| -> Result<(String, Value), serde_json::Error> {
                Ok((domain.to_string(), serde_json::to_value(days)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.update(move |raw| {
            for (domain, days) in updates {
                raw.insert(domain, days);
            }
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        self.update(|raw| {
            raw.clear();
            Ok(())
        })
        .await
    }

    async fn add(&self, domain: &str, day: DateKey, seconds: u64) -> Result<u64> {
        self.update(|raw| add_seconds(raw, domain, &day, seconds)).await
    }

    async fn prune_before(&self, cutoff: &DateKey) -> Result<SweepReport> {
        self.update(|raw| Ok(prune_raw(raw, cutoff))).await
    }
}
