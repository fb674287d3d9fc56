use std::{fmt::Display, path::PathBuf};

use ansi_term::Colour;
use anyhow::Result;
use chrono::{Duration, Local};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    metrics::{format_duration, minutes_rounded},
    render::chart::{bar, week_scale},
    store::{
        STORE_FILE_NAME,
        adapter::{JsonStoreAdapter, StoreAdapter},
    },
    utils::time::day_key,
};

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
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

#[derive(Debug, Parser)]
pub struct HistoryCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\""
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\""
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

const DEFAULT_PRINTED_DAYS: i64 = 7;
const HISTORY_BAR_WIDTH: usize = 30;

/// Command to process `history`. Prints one line per day in the range with
/// the recorded total and a bar scaled to the busiest day.
pub async fn process_history_command(dir: PathBuf, command: HistoryCommand) -> Result<()> {
    let HistoryCommand {
        start_date,
        end_date,
        date_style,
    } = command;

    let now = Local::now();
    let dialect: chrono_english::Dialect = date_style.into();

    let start = match start_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now - Duration::days(DEFAULT_PRINTED_DAYS - 1),
    }
    .beginning_of_day();
    let end = match end_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate end date {e}"),
                )
                .into());
        }
        None => now,
    };
    if end < start {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                "End date is before start date",
            )
            .into());
    }

    let adapter = JsonStoreAdapter::new(dir.join(STORE_FILE_NAME))?;
    let store = adapter.load().await;

    let mut rows = vec![];
    let mut day = start.date_naive();
    while day <= end.date_naive() {
        let total_ms = store.day(&day_key(day)).map(|r| r.total_ms).unwrap_or(0);
        rows.push((day, total_ms));
        day = day.succ_opt().expect("End of time should never happen");
    }

    let minutes = rows
        .iter()
        .map(|(_, total_ms)| minutes_rounded(*total_ms))
        .collect::<Vec<_>>();
    let scale = week_scale(&minutes);

    for ((day, total_ms), minutes) in rows.iter().zip(minutes) {
        println!(
            "{}  {}  {} {minutes:>4}m",
            day_key(*day),
            format_duration(*total_ms),
            Colour::Blue.paint(bar(minutes, scale, HISTORY_BAR_WIDTH)),
        );
    }

    let range_total = rows.iter().map(|(_, total_ms)| *total_ms).sum::<i64>();
    println!("\nTotal {}", format_duration(range_total));
    Ok(())
}
