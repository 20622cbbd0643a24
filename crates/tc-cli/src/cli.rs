//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::audit::AuditArgs;
use crate::commands::check::CheckArgs;
use crate::commands::delete::DeleteArgs;
use crate::commands::import::ImportArgs;
use crate::commands::search::SearchArgs;

/// Daily time-accounting reconciliation.
///
/// Recomputes net work, breaks and surcharges from raw time entries and
/// cross-checks them against the stored daily summaries.
#[derive(Debug, Parser)]
#[command(name = "tc", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import users, entries and summaries from a JSON document.
    Import(ImportArgs),

    /// Cross-check one user's day against its summary.
    Check(CheckArgs),

    /// Reconcile every stored user day within a date range.
    Audit(AuditArgs),

    /// Search entries by client, order number or note.
    Search(SearchArgs),

    /// Mark an entry as deleted; the row is kept.
    Delete(DeleteArgs),

    /// Show database location and row counts.
    Status,
}
