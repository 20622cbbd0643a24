//! Delete command: marks a stored entry as deleted without removing the row.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Args;

use super::util::open_database;
use crate::Config;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Entry ID to mark as deleted.
    pub id: String,
}

pub fn run<W: Write>(writer: &mut W, args: &DeleteArgs, config: &Config) -> Result<()> {
    let mut db = open_database(config)?;
    if !db.soft_delete_entry(&args.id)? {
        bail!("entry not found: {}", args.id);
    }
    tracing::debug!(id = %args.id, "entry marked deleted");

    writeln!(writer, "Marked entry {} as deleted", args.id)?;
    Ok(())
}
