//! Parallel reconciliation of many independent user days.

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::model::{DailySummary, TimeEntry};
use crate::reconcile::{ReconciliationReport, Tolerance};

/// Snapshot of one user's day, ready to reconcile.
#[derive(Debug, Clone)]
pub struct DayInput {
    pub user_id: String,
    pub date: NaiveDate,
    pub entries: Vec<TimeEntry>,
    pub summary: Option<DailySummary>,
}

/// Reconciles every day in parallel. Reports keep the input order.
pub fn reconcile_many(days: Vec<DayInput>, tolerance: &Tolerance) -> Vec<ReconciliationReport> {
    days.into_par_iter()
        .map(|day| {
            ReconciliationReport::build(day.user_id, day.date, day.entries, day.summary, tolerance)
        })
        .collect()
}
