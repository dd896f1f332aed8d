use std::{fmt::Display, io::Write, path::PathBuf};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use chrono_english::parse_date_string;
use clap::ValueEnum;
use now::DateTimeNow;

use crate::{
    storage::{
        keys::date_key,
        reader::StoreReader,
        store::TimeStore,
        week_store::WeekStore,
    },
    utils::dir::create_application_default_path,
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

fn open_reader() -> Result<StoreReader<WeekStore>> {
    let records = create_application_default_path()?.join("records");
    Ok(StoreReader::new(WeekStore::new(records)?))
}

/// Parses human date input like "yesterday" or "15/03/2025". Defaults to now.
fn parse_date_arg(value: Option<String>, style: DateStyle) -> Result<DateTime<Local>> {
    let now = Local::now();
    match value {
        None => Ok(now),
        Some(s) => parse_date_string(&s, now, style.into())
            .map_err(|e| anyhow!("Failed to parse date \"{s}\": {e}")),
    }
}

/// The popup view: today's (or the given date's) domains, sorted by time.
pub async fn process_today(
    date: Option<String>,
    style: DateStyle,
    limit: Option<usize>,
) -> Result<()> {
    let date = parse_date_arg(date, style)?.date_naive();
    let reader = open_reader()?;

    let sites = reader.top_sites(date, limit.unwrap_or(usize::MAX)).await?;
    if sites.is_empty() {
        println!("No activity recorded for {}", date_key(date));
        return Ok(());
    }

    println!("{}", date_key(date));
    for (domain, millis) in sites {
        println!("{}\t{domain}", format_hms(millis));
    }
    Ok(())
}

/// The dashboard view: Monday through Sunday totals plus hero stats for the
/// week containing the given date.
pub async fn process_week(date: Option<String>, style: DateStyle) -> Result<()> {
    let moment = parse_date_arg(date, style)?;
    let monday = moment.beginning_of_week().date_naive();
    let today = moment.date_naive();
    let reader = open_reader()?;

    let breakdown = reader.week_breakdown(monday).await?;
    for (day, millis) in &breakdown {
        println!(
            "{}\t{}m",
            day.format("%a %Y-%m-%d"),
            millis / 1000 / 60
        );
    }

    let total_today: u64 = breakdown
        .iter()
        .find(|(day, _)| *day == today)
        .map(|(_, millis)| *millis)
        .unwrap_or(0);
    println!();
    println!("Total for {}: {}", date_key(today), format_human(total_today));

    let top = reader.top_sites(today, 1).await?;
    if let Some((domain, millis)) = top.first() {
        let percentage = if total_today > 0 {
            millis * 100 / total_today
        } else {
            0
        };
        println!("Most visited: {domain} ({percentage}% of total time)");
    }

    let week_total: u64 = breakdown.iter().map(|(_, millis)| millis).sum();
    println!("Daily average: {}", format_human(week_total / 7));
    Ok(())
}

/// The heatmap view: one line per day with its 0..=5 intensity level.
pub async fn process_heatmap(days: u32, style: DateStyle, until: Option<String>) -> Result<()> {
    let until = parse_date_arg(until, style)?.date_naive();
    let reader = open_reader()?;

    for day in reader.activity(days, until).await? {
        println!(
            "{}\t{}\t{}",
            date_key(day.date),
            "▪".repeat(day.level as usize),
            format_human(day.millis)
        );
    }
    Ok(())
}

/// Dumps the whole store into a backup document.
pub async fn process_export(output: Option<PathBuf>) -> Result<()> {
    let reader = open_reader()?;
    let document = reader.export().await?;

    let path = output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "tabtime-backup-{}.json",
            date_key(Local::now().date_naive())
        ))
    });
    std::fs::write(&path, document)?;
    println!("Exported to {}", path.display());
    Ok(())
}

/// Restores week records from a backup document.
pub async fn process_import(file: PathBuf) -> Result<()> {
    let reader = open_reader()?;
    let document = std::fs::read_to_string(&file)?;
    reader.import(&document).await?;
    println!("Imported {}", file.display());
    Ok(())
}

/// Irreversibly wipes every stored week. Asks first unless `--yes` was given.
pub async fn process_clear(yes: bool) -> Result<()> {
    if !yes && !confirm("Delete ALL tracking data? This cannot be undone.")? {
        println!("Aborted.");
        return Ok(());
    }

    let records = create_application_default_path()?.join("records");
    WeekStore::new(records)?.clear().await?;
    println!("Data cleared.");
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

/// Formats milliseconds as HH:MM:SS, the popup's list format.
fn format_hms(millis: u64) -> String {
    let seconds = millis / 1000;
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60
    )
}

/// Compact human duration, the dashboard's format.
fn format_human(millis: u64) -> String {
    let seconds = millis / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{hours}h {}m", minutes % 60)
    } else if minutes > 0 {
        format!("{minutes}m {}s", seconds % 60)
    } else {
        format!("{}s", seconds % 60)
    }
}
