//! Check command: cross-checks one user's day against its stored summary.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use tc_core::{
    DaySource, ReconciliationReport, TimeEntry, Tolerance, UserDirectory, UserSettings, check_day,
    format_hours, format_minutes, resolve_user,
};
use tc_rest::RestSource;

use super::util::{heading, open_database, optional_hours, time_span, write_json};
use crate::Config;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Display name of the user; falls back to a substring match.
    #[arg(long)]
    pub user: String,

    /// Day to check (YYYY-MM-DD).
    #[arg(long)]
    pub date: NaiveDate,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,

    /// Read from the configured REST backend instead of the local database.
    #[arg(long)]
    pub remote: bool,
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    user: &'a UserSettings,
    report: &'a ReconciliationReport,
}

pub fn run<W: Write>(writer: &mut W, args: &CheckArgs, config: &Config) -> Result<()> {
    let (user, report) = if args.remote {
        let remote = config
            .remote
            .as_ref()
            .context("no remote backend configured; add a [remote] section to config.toml")?;
        let source = RestSource::new(remote).context("failed to create REST client")?;
        load_day(&source, &args.user, args.date, &config.tolerance)?
    } else {
        let db = open_database(config)?;
        load_day(&db, &args.user, args.date, &config.tolerance)?
    };

    if args.json {
        write_json(
            writer,
            &CheckOutput {
                user: &user,
                report: &report,
            },
        )
    } else {
        render(writer, &user, &report)
    }
}

fn load_day<S>(
    source: &S,
    display_name: &str,
    date: NaiveDate,
    tolerance: &Tolerance,
) -> Result<(UserSettings, ReconciliationReport)>
where
    S: DaySource + UserDirectory,
{
    let user = resolve_user(source, display_name)?;
    let report = check_day(source, &user.user_id, date, tolerance)
        .with_context(|| format!("failed to load {} on {date}", user.display_name))?;
    Ok((user, report))
}

fn render<W: Write>(writer: &mut W, user: &UserSettings, report: &ReconciliationReport) -> Result<()> {
    writeln!(writer, "User: {} ({})", user.display_name, user.user_id)?;
    writeln!(writer, "Date: {}", report.date)?;

    writeln!(writer)?;
    heading(writer, "RAW ENTRIES")?;
    if report.entries.is_empty() {
        writeln!(writer, "No entries found.")?;
    }
    for entry in &report.entries {
        render_entry(writer, entry)?;
    }

    writeln!(writer)?;
    heading(writer, "DAILY SUMMARY")?;
    match &report.summary {
        Some(summary) => {
            let work = summary.total_work_minutes.map(|m| m / 60.0);
            let effective = summary.total_effective_minutes.map(|m| m / 60.0);
            writeln!(writer, "Work:      {}", optional_hours(work))?;
            writeln!(writer, "Surcharge: {}", optional_hours(summary.total_surcharge_hours))?;
            writeln!(writer, "Vacation:  {}", optional_hours(summary.vacation_hours))?;
            writeln!(writer, "Sick:      {}", optional_hours(summary.sick_hours))?;
            writeln!(writer, "Effective: {}", optional_hours(effective))?;
        }
        None => writeln!(writer, "No summary found.")?,
    }

    let totals = &report.totals;
    writeln!(writer)?;
    heading(writer, "COMPUTED")?;
    writeln!(writer, "Gross work: {}", format_minutes(totals.work_minutes))?;
    writeln!(writer, "Breaks:     {}", format_minutes(totals.break_minutes))?;
    writeln!(writer, "Net work:   {}", format_minutes(totals.net_work_minutes))?;
    writeln!(writer, "Surcharge:  {}", format_hours(totals.surcharge_hours))?;
    writeln!(writer, "Combined:   {}", format_hours(totals.combined_hours))?;
    if totals.deleted_entries > 0 {
        writeln!(writer, "Deleted entries ignored: {}", totals.deleted_entries)?;
    }

    writeln!(writer)?;
    heading(writer, "CROSS-CHECK")?;
    for (label, field) in report.reconciliation.fields() {
        let baseline = field
            .baseline
            .map_or_else(|| "-".to_string(), |b| format!("{b:.2}"));
        writeln!(
            writer,
            "{label:<16} {:>8.2} vs {baseline:>8}  {}",
            field.computed, field.status
        )?;
    }

    writeln!(writer)?;
    heading(writer, "FINDINGS")?;
    if report.findings.is_empty() {
        writeln!(writer, "No entry issues.")?;
    }
    for finding in &report.findings {
        writeln!(writer, "{}: {}", finding.entry_id, finding.issue)?;
    }

    Ok(())
}

fn render_entry<W: Write>(writer: &mut W, entry: &TimeEntry) -> Result<()> {
    let status = if entry.is_deleted {
        "[DELETED]"
    } else {
        "[ACTIVE]"
    };
    let duration = entry
        .calc_duration_minutes
        .map_or_else(|| "-".to_string(), |m| format!("{m} min"));
    let rate = entry
        .surcharge
        .map_or_else(|| "-".to_string(), |r| format!("{r}%"));

    writeln!(writer, "{status} {}", entry.id)?;
    writeln!(
        writer,
        "   Type: {} | Client: {}",
        entry.kind,
        entry.client_name.as_deref().unwrap_or("-")
    )?;
    writeln!(writer, "   Time: {}", time_span(entry))?;
    writeln!(
        writer,
        "   Hours: {} | Duration: {duration} | Surcharge: {rate} ({})",
        optional_hours(entry.hours),
        optional_hours(entry.calc_surcharge_hours)
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tc_core::{DailySummary, EntryType};
    use tc_db::Database;

    use insta::assert_snapshot;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
    }

    fn entry(id: &str, kind: EntryType, start: &str, end: &str, minutes: i64) -> TimeEntry {
        TimeEntry {
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            calc_duration_minutes: Some(minutes),
            ..TimeEntry::new(id, "user-1", date(), kind)
        }
    }

    fn seeded_config(temp: &tempfile::TempDir, summary: bool) -> Config {
        let config = Config {
            database_path: temp.path().join("tc.db"),
            ..Config::default()
        };
        let mut db = Database::open(&config.database_path).unwrap();
        db.upsert_users(&[UserSettings {
            user_id: "user-1".to_string(),
            display_name: "Test-Installer".to_string(),
        }])
        .unwrap();

        let work = TimeEntry {
            hours: Some(5.0),
            surcharge: Some(0.0),
            calc_surcharge_hours: Some(0.0),
            client_name: Some("Acme".to_string()),
            ..entry("e1", EntryType::Work, "07:00:00", "12:00:00", 300)
        };
        let lunch = entry("e2", EntryType::Break, "12:00", "12:30", 30);
        let deleted = TimeEntry {
            hours: Some(1.0),
            is_deleted: true,
            client_name: Some("Acme".to_string()),
            ..entry("e3", EntryType::Work, "13:00", "14:00", 60)
        };
        db.upsert_entries(&[work, lunch, deleted]).unwrap();

        if summary {
            db.upsert_summaries(&[DailySummary {
                total_work_minutes: Some(270.0),
                total_surcharge_hours: Some(0.0),
                total_effective_minutes: Some(270.0),
                ..DailySummary::new("user-1", date())
            }])
            .unwrap();
        }
        config
    }

    fn args(user: &str, json: bool) -> CheckArgs {
        CheckArgs {
            user: user.to_string(),
            date: date(),
            json,
            remote: false,
        }
    }

    #[test]
    fn check_renders_matching_day() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, true);

        let mut output = Vec::new();
        run(&mut output, &args("Test-Installer", false), &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output, @r"
        User: Test-Installer (user-1)
        Date: 2026-01-31

        RAW ENTRIES
        ───────────
        [ACTIVE] e1
           Type: work | Client: Acme
           Time: 07:00-12:00
           Hours: 05:00 | Duration: 300 min | Surcharge: 0% (00:00)
        [ACTIVE] e2
           Type: break | Client: -
           Time: 12:00-12:30
           Hours: - | Duration: 30 min | Surcharge: - (-)
        [DELETED] e3
           Type: work | Client: Acme
           Time: 13:00-14:00
           Hours: 01:00 | Duration: 60 min | Surcharge: - (-)

        DAILY SUMMARY
        ─────────────
        Work:      04:30
        Surcharge: 00:00
        Vacation:  -
        Sick:      -
        Effective: 04:30

        COMPUTED
        ────────
        Gross work: 05:00
        Breaks:     00:30
        Net work:   04:30
        Surcharge:  00:00
        Combined:   04:30
        Deleted entries ignored: 1

        CROSS-CHECK
        ───────────
        work_minutes       270.00 vs   270.00  MATCH
        surcharge_hours      0.00 vs     0.00  MATCH
        effective_hours      4.50 vs     4.50  MATCH

        FINDINGS
        ────────
        No entry issues.
        ");
    }

    #[test]
    fn check_without_summary_reports_no_baseline() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, false);

        let mut output = Vec::new();
        run(&mut output, &args("installer", false), &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("No summary found."));
        assert!(output.contains("work_minutes       270.00 vs        -  NO_BASELINE"));
    }

    #[test]
    fn check_json_contains_user_and_statuses() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, true);

        let mut output = Vec::new();
        run(&mut output, &args("Test-Installer", true), &config).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["user"]["display_name"], "Test-Installer");
        assert_eq!(value["report"]["entries"].as_array().unwrap().len(), 3);
        assert_eq!(value["report"]["totals"]["net_work_minutes"], 270);
        assert_eq!(
            value["report"]["reconciliation"]["effective_hours"]["status"],
            "MATCH"
        );
    }

    #[test]
    fn check_lists_entry_findings() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, true);
        let mut db = Database::open(&config.database_path).unwrap();
        db.upsert_entries(&[entry("e4", EntryType::Work, "15:00", "19:00", 200)])
            .unwrap();

        let mut output = Vec::new();
        run(&mut output, &args("Test-Installer", false), &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("e4: derived duration 200 min does not match time span of 240 min"));
        assert!(output.contains("DRIFT"));
    }

    #[test]
    fn check_rejects_unknown_user() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, true);

        let mut output = Vec::new();
        let err = run(&mut output, &args("Nobody", false), &config).unwrap_err();
        assert!(err.to_string().contains("user not found: Nobody"));
    }

    #[test]
    fn check_remote_requires_configuration() {
        let temp = tempfile::tempdir().unwrap();
        let config = seeded_config(&temp, true);
        let args = CheckArgs {
            remote: true,
            ..args("Test-Installer", false)
        };

        let mut output = Vec::new();
        let err = run(&mut output, &args, &config).unwrap_err();
        assert!(err.to_string().contains("no remote backend configured"));
    }
}
