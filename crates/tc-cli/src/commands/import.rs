//! Import command for loading users, entries and summaries into the local `SQLite` store.

use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use serde::Deserialize;

use tc_core::{DailySummary, TimeEntry, UserSettings};

use super::util::open_database;
use crate::Config;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// JSON document to read instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Export shape: `{"users": [...], "entries": [...], "summaries": [...]}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImportDocument {
    users: Vec<UserSettings>,
    entries: Vec<TimeEntry>,
    summaries: Vec<DailySummary>,
}

/// Rows written per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportCounts {
    pub users: usize,
    pub entries: usize,
    pub summaries: usize,
}

pub fn run<W: Write>(writer: &mut W, args: &ImportArgs, config: &Config) -> Result<ImportCounts> {
    let document = match &args.file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            parse_document(BufReader::new(file))?
        }
        None => parse_document(io::stdin().lock())?,
    };

    let mut db = open_database(config)?;
    let counts = ImportCounts {
        users: db.upsert_users(&document.users)?,
        entries: db.upsert_entries(&document.entries)?,
        summaries: db.upsert_summaries(&document.summaries)?,
    };
    tracing::debug!(?counts, "import finished");

    writeln!(
        writer,
        "Imported {} users, {} entries, {} summaries",
        counts.users, counts.entries, counts.summaries
    )?;
    Ok(counts)
}

fn parse_document<R: Read>(reader: R) -> Result<ImportDocument> {
    let mut document: ImportDocument =
        serde_json::from_reader(reader).context("invalid import document")?;

    for (idx, user) in document.users.iter().enumerate() {
        if user.user_id.trim().is_empty() {
            bail!("user {}: missing user_id", idx + 1);
        }
    }
    for (idx, entry) in document.entries.iter_mut().enumerate() {
        if entry.user_id.trim().is_empty() {
            bail!("entry {}: missing user_id", idx + 1);
        }
        if entry.id.trim().is_empty() {
            entry.id = uuid::Uuid::new_v4().to_string();
        }
    }
    for (idx, summary) in document.summaries.iter().enumerate() {
        if summary.user_id.trim().is_empty() {
            bail!("summary {}: missing user_id", idx + 1);
        }
    }

    Ok(document)
}
