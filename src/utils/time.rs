use chrono::{DateTime, Duration, NaiveDate, TimeZone};

/// This is the standard way of converting a date to a ledger key in sitewatch.
pub fn date_to_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Whole seconds between two moments. Sub-second remainders are truncated and moments going
/// backwards yield zero.
pub fn elapsed_seconds<Tz: TimeZone>(from: &DateTime<Tz>, to: &DateTime<Tz>) -> u64 {
    let elapsed = to.clone().signed_duration_since(from.clone());
    if elapsed < Duration::zero() {
        return 0;
    }
    (elapsed.num_milliseconds() / 1000) as u64
}

/// Returns `count` consecutive days ending with `last` (inclusive), oldest first.
pub fn days_ending_at(last: NaiveDate, count: u32) -> Vec<NaiveDate> {
    (0..count as i64)
        .rev()
        .filter_map(|offset| last.checked_sub_signed(Duration::days(offset)))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::{date_to_key, days_ending_at, elapsed_seconds};

    #[test]
    fn test_date_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(date_to_key(date), "2024-03-07");
    }

    #[test]
    fn test_elapsed_truncates_and_clamps() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(elapsed_seconds(&start, &(start + Duration::milliseconds(999))), 0);
        assert_eq!(elapsed_seconds(&start, &(start + Duration::milliseconds(2999))), 2);
        assert_eq!(elapsed_seconds(&start, &(start - Duration::seconds(5))), 0);
    }

    #[test]
    fn test_days_ending_at_crosses_month() {
        let days = days_ending_at(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(), 7);
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 2, 25).unwrap());
        assert_eq!(days[6], NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }
}
