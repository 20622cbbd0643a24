//! Per-entry consistency checks of derived fields.
//!
//! The derived `calc_duration_minutes` and `calc_surcharge_hours` of an active
//! entry must be non-negative and agree with its wall-clock bounds and
//! surcharge rate. User-entered `hours` should agree with the derived
//! duration for WORK and BREAK entries.

use std::fmt;

use chrono::{NaiveTime, Timelike};
use serde::Serialize;

use crate::entry_type::{EntryClass, classify};
use crate::model::TimeEntry;
use crate::reconcile::Tolerance;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Which wall-clock bound of an entry a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    StartTime,
    EndTime,
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartTime => f.write_str("start_time"),
            Self::EndTime => f.write_str("end_time"),
        }
    }
}

/// A detected inconsistency in one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryIssue {
    NegativeDuration { minutes: i64 },
    NegativeSurcharge { hours: f64 },
    UnparseableTime { field: TimeField, value: String },
    DurationMismatch { recorded: i64, expected: i64 },
    SurchargeExceedsInterval { recorded: f64, maximum: f64 },
    HoursMismatch { hours: f64, derived: f64 },
}

impl fmt::Display for EntryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeDuration { minutes } => {
                write!(f, "negative derived duration: {minutes} min")
            }
            Self::NegativeSurcharge { hours } => {
                write!(f, "negative derived surcharge: {hours:.2} h")
            }
            Self::UnparseableTime { field, value } => {
                write!(f, "unparseable {field}: {value:?}")
            }
            Self::DurationMismatch { recorded, expected } => write!(
                f,
                "derived duration {recorded} min does not match time span of {expected} min"
            ),
            Self::SurchargeExceedsInterval { recorded, maximum } => write!(
                f,
                "derived surcharge {recorded:.2} h exceeds interval maximum of {maximum:.2} h"
            ),
            Self::HoursMismatch { hours, derived } => write!(
                f,
                "hours field {hours:.2} h does not match derived {derived:.2} h"
            ),
        }
    }
}

/// An issue attributed to a specific entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFinding {
    pub entry_id: String,
    pub issue: EntryIssue,
}

/// Parses a wall-clock time (`HH:MM`, `HH:MM:SS[.f]`) into minutes since midnight.
///
/// `24:00` is accepted as the end of the day.
pub fn parse_wall_clock(s: &str) -> Option<i64> {
    let s = s.trim();
    if matches!(s, "24:00" | "24:00:00") {
        return Some(MINUTES_PER_DAY);
    }
    let time = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()?;
    Some(i64::from(time.num_seconds_from_midnight() / 60))
}

/// Minutes between two wall-clock times, wrapping past midnight.
pub const fn span_minutes(start: i64, end: i64) -> i64 {
    if end >= start {
        end - start
    } else {
        end + MINUTES_PER_DAY - start
    }
}

/// Checks one entry; deleted entries are checked the same way.
#[allow(clippy::cast_precision_loss)]
pub fn audit_entry(entry: &TimeEntry, tolerance: &Tolerance) -> Vec<EntryIssue> {
    let mut issues = Vec::new();

    if let Some(minutes) = entry.calc_duration_minutes.filter(|m| *m < 0) {
        issues.push(EntryIssue::NegativeDuration { minutes });
    }
    if let Some(hours) = entry.calc_surcharge_hours.filter(|h| *h < 0.0) {
        issues.push(EntryIssue::NegativeSurcharge { hours });
    }

    let start = parse_bound(entry.start_time.as_deref(), TimeField::StartTime, &mut issues);
    let end = parse_bound(entry.end_time.as_deref(), TimeField::EndTime, &mut issues);
    let span = start.zip(end).map(|(start, end)| span_minutes(start, end));

    if let (Some(recorded), Some(expected)) = (entry.calc_duration_minutes, span) {
        if recorded.abs_diff(expected) as f64 >= tolerance.minutes {
            issues.push(EntryIssue::DurationMismatch { recorded, expected });
        }
    }

    let duration = entry
        .calc_duration_minutes
        .filter(|m| *m >= 0)
        .or(span);
    if let (Some(recorded), Some(duration)) = (entry.calc_surcharge_hours, duration) {
        let rate = entry
            .surcharge
            .filter(|r| r.is_finite())
            .unwrap_or(0.0)
            .max(0.0);
        let maximum = duration as f64 / 60.0 * rate / 100.0;
        if recorded.is_finite() && recorded - maximum >= tolerance.hours {
            issues.push(EntryIssue::SurchargeExceedsInterval { recorded, maximum });
        }
    }

    if classify(entry) != EntryClass::Other {
        let hours = entry.hours.filter(|h| h.is_finite());
        if let (Some(hours), Some(minutes)) = (hours, entry.calc_duration_minutes) {
            let derived = minutes as f64 / 60.0;
            if (hours - derived).abs() >= tolerance.hours {
                issues.push(EntryIssue::HoursMismatch { hours, derived });
            }
        }
    }

    issues
}

/// Checks every active entry and attributes issues to entry ids.
pub fn audit_entries(entries: &[TimeEntry], tolerance: &Tolerance) -> Vec<EntryFinding> {
    entries
        .iter()
        .filter(|entry| entry.is_active())
        .flat_map(|entry| {
            audit_entry(entry, tolerance)
                .into_iter()
                .map(|issue| EntryFinding {
                    entry_id: entry.id.clone(),
                    issue,
                })
        })
        .collect()
}

fn parse_bound(value: Option<&str>, field: TimeField, issues: &mut Vec<EntryIssue>) -> Option<i64> {
    let value = value.filter(|v| !v.trim().is_empty())?;
    let parsed = parse_wall_clock(value);
    if parsed.is_none() {
        issues.push(EntryIssue::UnparseableTime {
            field,
            value: value.to_string(),
        });
    }
    parsed
}
