//! Comparison of computed totals against a materialized daily summary.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{DailyTotals, aggregate};
use crate::audit::{EntryFinding, audit_entries};
use crate::model::{DailySummary, TimeEntry};

/// Differences below these thresholds are treated as floating-point noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    /// Tolerance for minute-valued comparisons.
    /// Default: 1.0
    pub minutes: f64,

    /// Tolerance for hour-valued comparisons.
    /// Default: 0.01
    pub hours: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            minutes: 1.0,
            hours: 0.01,
        }
    }
}

/// Outcome of comparing one quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComparisonStatus {
    Match,
    Drift,
    NoBaseline,
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Match => "MATCH",
            Self::Drift => "DRIFT",
            Self::NoBaseline => "NO_BASELINE",
        };
        write!(f, "{s}")
    }
}

/// Computed value, baseline value and their difference for one quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldComparison {
    pub computed: f64,
    pub baseline: Option<f64>,
    pub difference: Option<f64>,
    pub within_tolerance: Option<bool>,
    pub status: ComparisonStatus,
}

impl FieldComparison {
    /// Compares `computed` against `baseline`; strictly below `tolerance` matches.
    pub fn compare(computed: f64, baseline: f64, tolerance: f64) -> Self {
        let difference = (computed - baseline).abs();
        let within = difference < tolerance;
        Self {
            computed,
            baseline: Some(baseline),
            difference: Some(difference),
            within_tolerance: Some(within),
            status: if within {
                ComparisonStatus::Match
            } else {
                ComparisonStatus::Drift
            },
        }
    }

    pub const fn no_baseline(computed: f64) -> Self {
        Self {
            computed,
            baseline: None,
            difference: None,
            within_tolerance: None,
            status: ComparisonStatus::NoBaseline,
        }
    }

    pub fn is_drift(&self) -> bool {
        self.status == ComparisonStatus::Drift
    }
}

/// Per-quantity comparison of computed totals against the summary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reconciliation {
    /// Net work minutes vs. `total_work_minutes`.
    pub work_minutes: FieldComparison,

    /// Surcharge hours vs. `total_surcharge_hours`.
    pub surcharge_hours: FieldComparison,

    /// Combined hours vs. `total_effective_minutes / 60`.
    pub effective_hours: FieldComparison,
}

impl Reconciliation {
    /// Labeled comparisons in display order.
    pub const fn fields(&self) -> [(&'static str, &FieldComparison); 3] {
        [
            ("work_minutes", &self.work_minutes),
            ("surcharge_hours", &self.surcharge_hours),
            ("effective_hours", &self.effective_hours),
        ]
    }

    pub fn has_drift(&self) -> bool {
        self.fields().iter().any(|(_, field)| field.is_drift())
    }

    pub fn has_baseline(&self) -> bool {
        self.work_minutes.status != ComparisonStatus::NoBaseline
    }
}

/// Reconciles computed totals against an optional summary.
///
/// A missing summary marks every comparison as [`ComparisonStatus::NoBaseline`].
#[allow(clippy::cast_precision_loss)]
pub fn reconcile(
    totals: &DailyTotals,
    summary: Option<&DailySummary>,
    tolerance: &Tolerance,
) -> Reconciliation {
    let work = totals.net_work_minutes as f64;
    let Some(summary) = summary else {
        return Reconciliation {
            work_minutes: FieldComparison::no_baseline(work),
            surcharge_hours: FieldComparison::no_baseline(totals.surcharge_hours),
            effective_hours: FieldComparison::no_baseline(totals.combined_hours),
        };
    };

    Reconciliation {
        work_minutes: FieldComparison::compare(work, summary.work_minutes(), tolerance.minutes),
        surcharge_hours: FieldComparison::compare(
            totals.surcharge_hours,
            summary.surcharge_hours(),
            tolerance.hours,
        ),
        effective_hours: FieldComparison::compare(
            totals.combined_hours,
            summary.effective_minutes() / 60.0,
            tolerance.hours,
        ),
    }
}

/// Everything known about one user's day: raw rows, totals, comparison, findings.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub user_id: String,
    pub date: NaiveDate,
    /// All fetched entries, soft-deleted ones included for audit display.
    pub entries: Vec<TimeEntry>,
    pub totals: DailyTotals,
    pub summary: Option<DailySummary>,
    pub reconciliation: Reconciliation,
    pub findings: Vec<EntryFinding>,
}

impl ReconciliationReport {
    /// Runs aggregation, reconciliation and the entry audit for one day.
    pub fn build(
        user_id: impl Into<String>,
        date: NaiveDate,
        entries: Vec<TimeEntry>,
        summary: Option<DailySummary>,
        tolerance: &Tolerance,
    ) -> Self {
        let totals = aggregate(&entries);
        let reconciliation = reconcile(&totals, summary.as_ref(), tolerance);
        let findings = audit_entries(&entries, tolerance);
        Self {
            user_id: user_id.into(),
            date,
            entries,
            totals,
            summary,
            reconciliation,
            findings,
        }
    }

    /// True when a compared quantity drifted or an entry is inconsistent.
    pub fn has_drift(&self) -> bool {
        self.reconciliation.has_drift() || !self.findings.is_empty()
    }
}
