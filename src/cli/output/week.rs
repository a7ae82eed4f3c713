use chrono::NaiveDate;

use crate::{
    daemon::storage::entities::{DateKey, TimeLedger},
    utils::{
        percentage::{seconds_percentage, Percentage},
        time::days_ending_at,
    },
};

use super::today::{rank_sites, SiteTime};

pub const WEEK_LENGTH: u32 = 7;

/// Highest heatmap level.
pub const MAX_INTENSITY: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayTotal {
    pub date: DateKey,
    pub seconds: u64,
}

#[derive(Debug)]
pub struct WeekSummary {
    /// Oldest first.
    pub days: Vec<DayTotal>,
    /// Domains with any time in the week, longest first.
    pub domains: Vec<SiteTime>,
    pub total_seconds: u64,
    pub daily_average: u64,
    /// First day holding the highest total. The oldest day when nothing was recorded.
    pub most_active_day: Option<DateKey>,
}

/// Keys of the week ending with `today`, oldest first.
pub fn week_keys(today: NaiveDate) -> Vec<DateKey> {
    days_ending_at(today, WEEK_LENGTH)
        .into_iter()
        .map(DateKey::from)
        .collect()
}

/// Aggregates `ledger` over `days`.
pub fn week_view(ledger: &TimeLedger, days: &[DateKey]) -> WeekSummary {
    let mut days = days
        .iter()
        .map(|date| DayTotal {
            date: date.clone(),
            seconds: 0,
        })
        .collect::<Vec<_>>();
    let mut domains = Vec::new();

    for (domain, recorded) in ledger.domains() {
        let mut domain_total = 0;
        for day in days.iter_mut() {
            let seconds = recorded.get(&day.date).copied().unwrap_or(0);
            day.seconds += seconds;
            domain_total += seconds;
        }
        if domain_total > 0 {
            domains.push(SiteTime {
                domain: domain.clone(),
                seconds: domain_total,
            });
        }
    }
    rank_sites(&mut domains);

    let total_seconds = days.iter().map(|day| day.seconds).sum::<u64>();

    let mut most_active: Option<&DayTotal> = None;
    for day in &days {
        match most_active {
            Some(current) if day.seconds <= current.seconds => {}
            _ => most_active = Some(day),
        }
    }

    WeekSummary {
        most_active_day: most_active.map(|day| day.date.clone()),
        daily_average: total_seconds / WEEK_LENGTH as u64,
        total_seconds,
        domains,
        days,
    }
}

impl WeekSummary {
    /// Full weekday name of [Self::most_active_day], e.g. `Monday`.
    pub fn most_active_day_name(&self) -> Option<String> {
        self.most_active_day
            .as_ref()
            .and_then(DateKey::to_date)
            .map(|date| date.format("%A").to_string())
    }

    fn busiest_day_seconds(&self) -> u64 {
        self.days.iter().map(|day| day.seconds).max().unwrap_or(0)
    }

    /// Heatmap level of `day` from 0 to [MAX_INTENSITY], relative to the busiest day. Only days
    /// without any time get 0.
    pub fn intensity(&self, day: &DayTotal) -> u8 {
        if day.seconds == 0 {
            return 0;
        }
        let ratio = day.seconds as f64 / self.busiest_day_seconds().max(1) as f64;
        match ratio {
            r if r < 0.2 => 1,
            r if r < 0.4 => 2,
            r if r < 0.6 => 3,
            r if r < 0.8 => 4,
            _ => MAX_INTENSITY,
        }
    }

    /// Share of `site` relative to the top domain of the week.
    pub fn domain_share(&self, site: &SiteTime) -> Percentage {
        let top = self.domains.first().map_or(0, |top| top.seconds);
        seconds_percentage(site.seconds, top)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::daemon::storage::entities::{DateKey, TimeLedger};

    use super::{week_keys, week_view, DayTotal};

    fn first_week_of_2024() -> Vec<DateKey> {
        week_keys(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap())
    }

    #[test]
    fn test_week_totals() {
        let mut ledger = TimeLedger::new();
        ledger.add("example.com", DateKey::from("2024-01-01"), 3600);
        ledger.add("example.com", DateKey::from("2024-01-02"), 1800);
        let days = first_week_of_2024();
        assert_eq!(days.first(), Some(&DateKey::from("2024-01-01")));

        let summary = week_view(&ledger, &days);

        assert_eq!(summary.total_seconds, 5400);
        assert_eq!(summary.daily_average, 771);
        assert_eq!(summary.most_active_day, Some(DateKey::from("2024-01-01")));
        assert_eq!(summary.most_active_day_name().as_deref(), Some("Monday"));
        assert_eq!(
            summary.days[1],
            DayTotal {
                date: DateKey::from("2024-01-02"),
                seconds: 1800,
            }
        );
        assert_eq!(summary.domains.len(), 1);
        assert_eq!(summary.domains[0].seconds, 5400);
    }

    #[test]
    fn test_days_outside_week_and_empty_domains_are_ignored() {
        let mut ledger = TimeLedger::new();
        ledger.add("old.com", DateKey::from("2023-12-31"), 500);
        ledger.add("b.com", DateKey::from("2024-01-03"), 50);
        ledger.add("a.com", DateKey::from("2024-01-05"), 100);
        ledger.add("a.com", DateKey::from("2024-01-06"), 100);

        let summary = week_view(&ledger, &first_week_of_2024());

        let domains = summary
            .domains
            .iter()
            .map(|site| (&*site.domain, site.seconds))
            .collect::<Vec<_>>();
        assert_eq!(domains, vec![("a.com", 200), ("b.com", 50)]);
        assert_eq!(summary.total_seconds, 250);
        // Ties go to the earlier day.
        assert_eq!(summary.most_active_day, Some(DateKey::from("2024-01-05")));
        assert_eq!(*summary.domain_share(&summary.domains[1]), 25.);
    }

    #[test]
    fn test_empty_week_picks_first_day() {
        let summary = week_view(&TimeLedger::new(), &first_week_of_2024());
        assert_eq!(summary.total_seconds, 0);
        assert_eq!(summary.daily_average, 0);
        assert_eq!(summary.most_active_day, Some(DateKey::from("2024-01-01")));
        assert!(summary.days.iter().all(|day| summary.intensity(day) == 0));
    }

    #[test]
    fn test_intensity_levels() {
        let mut ledger = TimeLedger::new();
        for (date, seconds) in [
            ("2024-01-01", 1000),
            ("2024-01-02", 100),
            ("2024-01-03", 200),
            ("2024-01-04", 500),
            ("2024-01-05", 799),
            ("2024-01-06", 800),
        ] {
            ledger.add("a.com", DateKey::from(date), seconds);
        }

        let summary = week_view(&ledger, &first_week_of_2024());
        let levels = summary
            .days
            .iter()
            .map(|day| summary.intensity(day))
            .collect::<Vec<_>>();

        assert_eq!(levels, vec![5, 1, 2, 3, 4, 5, 0]);
    }
}
