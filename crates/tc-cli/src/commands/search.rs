//! Search command: entries matching a client, order number or note, grouped per user.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;

use tc_core::{SearchReport, TimeEntry, format_hours};

use super::util::{heading, open_database, optional_hours, time_span, write_json};
use crate::Config;

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Text to look for (case-insensitive).
    pub query: String,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run<W: Write>(writer: &mut W, args: &SearchArgs, config: &Config) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        bail!("search query cannot be empty");
    }

    let db = open_database(config)?;
    let entries = db.search_entries(query)?;
    let users = db.list_users()?;
    let report = SearchReport::build(entries, &users, query);

    if args.json {
        return write_json(writer, &report);
    }

    writeln!(writer, "Search: {query:?} ({} entries)", report.total_entries)?;
    if report.is_empty() {
        writeln!(writer, "No matching entries.")?;
        return Ok(());
    }

    for group in &report.groups {
        writeln!(writer)?;
        heading(
            writer,
            &format!("{} ({})", group.display_name, format_hours(group.total_hours)),
        )?;
        for entry in &group.entries {
            writeln!(
                writer,
                "{}  {:<10} {}  {}  {}",
                entry.date,
                entry.kind.as_str(),
                time_span(entry),
                optional_hours(entry.hours),
                details(entry)
            )?;
        }
    }
    Ok(())
}

fn details(entry: &TimeEntry) -> String {
    [&entry.client_name, &entry.order_number, &entry.note]
        .into_iter()
        .filter_map(|field| field.as_deref().map(str::trim))
        .filter(|value| !value.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}
