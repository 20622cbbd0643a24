//! Audit command: batch reconciliation of every stored user day in a range.

use std::collections::HashMap;
use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use tc_core::{DayInput, ReconciliationReport, format_hours, format_minutes, reconcile_many};
use tc_db::Database;

use super::util::{heading, open_database, write_json};
use crate::Config;

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// First day of the range (YYYY-MM-DD).
    #[arg(long)]
    pub from: NaiveDate,

    /// Last day of the range, inclusive.
    #[arg(long)]
    pub to: NaiveDate,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Only list days with drift or entry findings.
    #[arg(long)]
    pub drift_only: bool,
}

#[derive(Serialize)]
struct AuditOutput<'a> {
    from: NaiveDate,
    to: NaiveDate,
    checked: usize,
    drifted: usize,
    reports: &'a [ReconciliationReport],
}

pub fn run<W: Write>(writer: &mut W, args: &AuditArgs, config: &Config) -> Result<()> {
    if args.to < args.from {
        bail!("--to {} is before --from {}", args.to, args.from);
    }

    let db = open_database(config)?;
    let days = load_days(&db, args.from, args.to)?;
    let checked = days.len();
    tracing::debug!(checked, from = %args.from, to = %args.to, "reconciling days");

    let mut reports = reconcile_many(days, &config.tolerance);
    let drifted = reports.iter().filter(|r| r.has_drift()).count();
    for report in reports.iter().filter(|r| r.has_drift()) {
        tracing::warn!(
            user_id = %report.user_id,
            date = %report.date,
            findings = report.findings.len(),
            "drift detected"
        );
    }
    if args.drift_only {
        reports.retain(ReconciliationReport::has_drift);
    }

    if args.json {
        return write_json(
            writer,
            &AuditOutput {
                from: args.from,
                to: args.to,
                checked,
                drifted,
                reports: &reports,
            },
        );
    }

    heading(writer, &format!("AUDIT {} to {}", args.from, args.to))?;
    if checked == 0 {
        writeln!(writer, "No days with entries or summaries in range.")?;
        return Ok(());
    }

    let names: HashMap<String, String> = db
        .list_users()?
        .into_iter()
        .map(|user| (user.user_id, user.display_name))
        .collect();
    for report in &reports {
        let name = names
            .get(&report.user_id)
            .map_or(report.user_id.as_str(), String::as_str);
        render_line(writer, name, report)?;
    }

    writeln!(writer)?;
    writeln!(writer, "Checked {checked} days, {drifted} with drift.")?;
    Ok(())
}

fn load_days(db: &Database, from: NaiveDate, to: NaiveDate) -> Result<Vec<DayInput>> {
    let mut days = Vec::new();
    for day in db.days_in_range(from, to)? {
        let entries = db.entries_for_day(&day.user_id, day.date)?;
        let summary = db.summary_for_day(&day.user_id, day.date)?;
        days.push(DayInput {
            user_id: day.user_id,
            date: day.date,
            entries,
            summary,
        });
    }
    Ok(days)
}

fn render_line<W: Write>(writer: &mut W, name: &str, report: &ReconciliationReport) -> Result<()> {
    let statuses = report
        .reconciliation
        .fields()
        .iter()
        .map(|(label, field)| format!("{label}={}", field.status))
        .collect::<Vec<_>>()
        .join(" ");
    let findings = if report.findings.is_empty() {
        String::new()
    } else {
        format!("  findings={}", report.findings.len())
    };

    writeln!(
        writer,
        "{}  {name:<16} net {}  surcharge {}  {statuses}{findings}",
        report.date,
        format_minutes(report.totals.net_work_minutes),
        format_hours(report.totals.surcharge_hours),
    )?;
    Ok(())
}
