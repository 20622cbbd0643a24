//! Shared utilities for CLI commands.

use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use tc_core::{TimeEntry, format_hours};
use tc_db::Database;

use crate::Config;

/// Opens the configured database, creating its parent directory.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, value).context("failed to encode JSON")?;
    writeln!(writer)?;
    Ok(())
}

/// Writes a section title underlined with box-drawing characters.
pub fn heading<W: Write>(writer: &mut W, title: &str) -> Result<()> {
    writeln!(writer, "{title}")?;
    writeln!(writer, "{}", "─".repeat(title.chars().count()))?;
    Ok(())
}

/// `HH:MM-HH:MM` span of an entry, `-` for missing bounds.
pub fn time_span(entry: &TimeEntry) -> String {
    format!(
        "{}-{}",
        short_time(entry.start_time.as_deref()),
        short_time(entry.end_time.as_deref())
    )
}

/// Renders an optional decimal as `HH:MM`, `-` when absent.
pub fn optional_hours(hours: Option<f64>) -> String {
    hours.map_or_else(|| "-".to_string(), format_hours)
}

fn short_time(value: Option<&str>) -> &str {
    match value.map(str::trim) {
        // Drop seconds from HH:MM:SS.
        Some(v) if v.len() >= 5 && v.is_char_boundary(5) => &v[..5],
        Some(v) if !v.is_empty() => v,
        _ => "-",
    }
}
