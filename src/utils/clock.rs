use chrono::{DateTime, Local, NaiveDate};

/// Source of wall-clock time for the tracker. Swapped out in tests so that session
/// boundaries and day rollovers can be driven explicitly.
pub trait Clock: Sync + Send + 'static {
    /// Current moment in the user's time zone. Day buckets are derived from it.
    fn time(&self) -> DateTime<Local>;

    fn today(&self) -> NaiveDate {
        self.time().date_naive()
    }
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Local> {
        Local::now()
    }
}
