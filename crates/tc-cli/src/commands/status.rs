//! Status command for showing the database location and row counts.

use std::io::Write;

use anyhow::Result;

use super::util::open_database;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let counts = db.counts()?;

    writeln!(writer, "Timecheck status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(
        writer,
        "Remote: {}",
        config
            .remote
            .as_ref()
            .map_or("not configured", |remote| remote.url.as_str())
    )?;
    writeln!(writer, "Users: {}", counts.users)?;
    writeln!(
        writer,
        "Entries: {} ({} deleted)",
        counts.entries, counts.deleted_entries
    )?;
    writeln!(writer, "Summaries: {}", counts.summaries)?;

    Ok(())
}
