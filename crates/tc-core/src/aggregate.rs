//! Reduction of one user's entries for one day into scalar totals.
//!
//! # Algorithm Summary
//!
//! 1. Drop soft-deleted entries (they only count towards `deleted_entries`)
//! 2. Sum derived minutes of WORK entries and of BREAK entries
//! 3. Net work is work minus breaks, deliberately not clamped at zero
//! 4. Surcharge hours are summed over every active entry, whatever its class
//! 5. Combined hours = net work in hours + surcharge hours

use serde::Serialize;

use crate::entry_type::{EntryClass, classify};
use crate::model::TimeEntry;

/// Computed totals for one user and day.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DailyTotals {
    /// Sum of derived minutes over WORK entries.
    pub work_minutes: i64,

    /// Sum of derived minutes over BREAK entries.
    pub break_minutes: i64,

    /// `work_minutes - break_minutes`; negative when breaks exceed work.
    pub net_work_minutes: i64,

    /// Sum of derived surcharge hours over all active entries.
    pub surcharge_hours: f64,

    /// Net work in hours plus surcharge hours.
    pub combined_hours: f64,

    pub active_entries: usize,
    pub deleted_entries: usize,

    /// Active entries classified as OTHER (absences, unknown types).
    pub other_entries: usize,
}

impl DailyTotals {
    #[allow(clippy::cast_precision_loss)]
    pub fn net_work_hours(&self) -> f64 {
        self.net_work_minutes as f64 / 60.0
    }
}

/// Aggregates entries into [`DailyTotals`], ignoring soft-deleted ones.
///
/// Never fails: absent numeric fields contribute zero.
pub fn aggregate(entries: &[TimeEntry]) -> DailyTotals {
    let mut totals = DailyTotals::default();

    for entry in entries {
        if !entry.is_active() {
            totals.deleted_entries += 1;
            continue;
        }
        totals.active_entries += 1;

        match classify(entry) {
            EntryClass::Work => {
                totals.work_minutes = totals.work_minutes.saturating_add(entry.duration_minutes());
            }
            EntryClass::Break => {
                totals.break_minutes = totals.break_minutes.saturating_add(entry.duration_minutes());
            }
            EntryClass::Other => totals.other_entries += 1,
        }

        totals.surcharge_hours += entry.surcharge_hours();
    }

    totals.net_work_minutes = totals.work_minutes.saturating_sub(totals.break_minutes);
    totals.combined_hours = totals.net_work_hours() + totals.surcharge_hours;
    totals
}
