use std::{fmt::Display, path::Path};

use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    daemon::storage::{
        entities::DateKey,
        ledger_store::{JsonFileStore, LedgerStore},
    },
    utils::percentage::seconds_percentage,
};

use super::{
    output::{
        bar, format_time, intensity_style,
        today::{today_view, TodaySummary, DEFAULT_TOP_SITES},
        week::{week_keys, week_view, WeekSummary},
    },
    Args,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct DayParams {
    #[arg(
        long = "date",
        short,
        help = "Day to report instead of today. Examples are \"yesterday\", \"2 days ago\", \"15/03/2025\""
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

impl DayParams {
    /// The requested day, defaulting to the local today.
    fn resolve(&self) -> Result<NaiveDate> {
        let now = Local::now();
        match &self.date {
            None => Ok(now.date_naive()),
            Some(date) => match parse_date_string(date, now, self.date_style.into()) {
                Ok(v) => Ok(v.with_timezone(&Local).date_naive()),
                Err(e) => Err(Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        format!("Failed to validate date {e}"),
                    )
                    .into()),
            },
        }
    }
}

#[derive(Debug, Parser)]
pub struct TodayCommand {
    #[command(flatten)]
    day: DayParams,
    #[arg(short, long, default_value_t = DEFAULT_TOP_SITES, help = "How many sites to list")]
    top: usize,
}

#[derive(Debug, Parser)]
pub struct WeekCommand {
    #[command(flatten)]
    day: DayParams,
}

/// Prints time per site for a single day, the terminal counterpart of the extension popup.
pub async fn process_today_command(dir: &Path, command: TodayCommand) -> Result<()> {
    let day = DateKey::from(command.day.resolve()?);
    let ledger = JsonFileStore::new(dir.to_owned())?.get(None).await?;
    print_today(&today_view(&ledger, &day, command.top));
    Ok(())
}

/// Prints the 7 days ending with the requested day as a heatmap plus per-domain totals.
pub async fn process_week_command(dir: &Path, command: WeekCommand) -> Result<()> {
    let days = week_keys(command.day.resolve()?);
    let ledger = JsonFileStore::new(dir.to_owned())?.get(None).await?;
    print_week(&week_view(&ledger, &days));
    Ok(())
}

fn print_today(summary: &TodaySummary) {
    println!(
        "{}\t{}",
        summary.date,
        ansi_term::Style::new()
            .bold()
            .paint(format_time(summary.total_seconds))
    );
    if summary.sites.is_empty() {
        println!("No browsing time recorded");
        return;
    }
    for (place, site) in summary.sites.iter().enumerate() {
        let share = seconds_percentage(site.seconds, summary.total_seconds);
        println!(
            "{}.\t{}%\t{}\t{}",
            place + 1,
            *share as i32,
            format_time(site.seconds),
            site.domain
        );
    }
}

fn print_week(summary: &WeekSummary) {
    for day in &summary.days {
        let label = day
            .date
            .to_date()
            .map(|date| date.format("%a %b %e").to_string())
            .unwrap_or_else(|| day.date.to_string());
        let level = summary.intensity(day);
        println!(
            "{}\t{}\t{}",
            label,
            intensity_style(level).paint("■".repeat(level.max(1) as usize)),
            format_time(day.seconds)
        );
    }
    println!();
    println!("Total\t\t{}", format_time(summary.total_seconds));
    println!("Daily average\t{}", format_time(summary.daily_average));
    if let Some(name) = summary.most_active_day_name() {
        println!("Most active\t{name}");
    }
    println!();

    if summary.domains.is_empty() {
        println!("No browsing data yet");
        return;
    }
    for site in &summary.domains {
        println!(
            "{}\t{}\t{}",
            bar(summary.domain_share(site)),
            format_time(site.seconds),
            site.domain
        );
    }
}
