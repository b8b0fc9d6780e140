use std::{
    fmt::Display,
    io::{BufRead, Write},
};

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{
    tracker::{entities::Entry, storage::KeyValueStorage, store::EntryStore},
    utils::percentage::Percentage,
};

use super::{output::print_entry, Args};

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
    #[arg(short = 'n', long, help = "Show at most this many entries")]
    limit: Option<usize>,
    #[arg(
        long,
        short,
        help = "Only show entries saved after this moment. Examples are \"yesterday\", \"2 days ago\", \"15/03/2025\", \"12:00 16/03/2025\""
    )]
    since: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        short = 'p',
        long = "min-accuracy",
        help = "Only show entries with a time perception result of at least this accuracy"
    )]
    min_accuracy: Option<Percentage>,
}

/// Narrows down which entries are shown. This doesn't affect stored entries.
#[derive(Debug, Default)]
struct HistoryFilter {
    limit: Option<usize>,
    since: Option<DateTime<Utc>>,
    min_accuracy: Option<Percentage>,
}

impl HistoryFilter {
    fn matches(&self, entry: &Entry) -> bool {
        if self.since.is_some_and(|since| entry.timestamp < since) {
            return false;
        }
        match self.min_accuracy {
            Some(min) => entry
                .fields
                .time_perception
                .as_ref()
                .is_some_and(|v| v.accuracy >= min),
            None => true,
        }
    }

    fn select<'a>(&self, entries: &'a [Entry]) -> Vec<&'a Entry> {
        entries
            .iter()
            .filter(|entry| self.matches(entry))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

fn parse_filter(
    HistoryCommand {
        limit,
        since,
        date_style,
        min_accuracy,
    }: HistoryCommand,
) -> Result<HistoryFilter> {
    let since = match since.map(|s| parse_date_string(&s, Local::now(), date_style.into())) {
        Some(Ok(v)) => Some(v.with_timezone(&Utc)),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate since date {e}"),
                )
                .into());
        }
        None => None,
    };
    Ok(HistoryFilter {
        limit,
        since,
        min_accuracy,
    })
}

/// Prints saved entries, newest first.
pub fn process_history_command<S: KeyValueStorage>(
    store: &EntryStore<S>,
    command: HistoryCommand,
    out: &mut impl Write,
) -> Result<()> {
    let filter = parse_filter(command)?;
    let entries = store.entries()?;
    if entries.is_empty() {
        writeln!(out, "No entries yet. Start tracking to see your history!")?;
        return Ok(());
    }

    let selected = filter.select(entries);
    if selected.is_empty() {
        writeln!(out, "No entries match.")?;
    }
    for entry in selected {
        print_entry(out, entry)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Clears the history. Unless `confirmed` is set, the user is asked first.
pub async fn process_clear_command<S: KeyValueStorage>(
    store: &mut EntryStore<S>,
    confirmed: bool,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    if store.entries()?.is_empty() {
        writeln!(out, "History is already empty.")?;
        return Ok(());
    }

    if !confirmed {
        write!(
            out,
            "Are you sure you want to clear all history? This cannot be undone. [y/N]: "
        )?;
        out.flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            writeln!(out, "Nothing was cleared.")?;
            return Ok(());
        }
    }

    let removed = store.clear_entries().await?;
    writeln!(out, "Removed {removed} entries.")?;
    Ok(())
}
