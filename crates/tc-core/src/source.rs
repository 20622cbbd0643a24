//! Narrow read interfaces to whatever backend holds entries and summaries.

use chrono::NaiveDate;
use thiserror::Error;

use crate::model::{DailySummary, TimeEntry, UserSettings};
use crate::reconcile::{ReconciliationReport, Tolerance};

/// Read access to the entries and summary of one user's day.
pub trait DaySource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All entries of the user on `date`, soft-deleted ones included.
    fn fetch_entries(&self, user_id: &str, date: NaiveDate)
    -> Result<Vec<TimeEntry>, Self::Error>;

    /// The materialized summary, `None` when none exists.
    fn fetch_summary(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, Self::Error>;
}

/// How a display name is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact,
    /// Case-insensitive substring match.
    Contains,
}

/// Lookup of users by display name.
pub trait UserDirectory {
    type Error: std::error::Error + Send + Sync + 'static;

    fn find_users(
        &self,
        display_name: &str,
        matching: NameMatch,
    ) -> Result<Vec<UserSettings>, Self::Error>;
}

/// Errors from [`resolve_user`].
#[derive(Debug, Error)]
pub enum ResolveError<E> {
    #[error("user not found: {0}")]
    NotFound(String),
    #[error("failed to look up users")]
    Source(#[source] E),
}

/// Resolves a display name to a user, preferring an exact match.
///
/// Falls back to a case-insensitive substring match; the first hit wins.
pub fn resolve_user<D>(
    directory: &D,
    display_name: &str,
) -> Result<UserSettings, ResolveError<D::Error>>
where
    D: UserDirectory + ?Sized,
{
    let exact = directory
        .find_users(display_name, NameMatch::Exact)
        .map_err(ResolveError::Source)?;
    if let Some(user) = exact.into_iter().next() {
        return Ok(user);
    }

    tracing::warn!(display_name, "no exact display name match, searching by substring");
    let similar = directory
        .find_users(display_name, NameMatch::Contains)
        .map_err(ResolveError::Source)?;
    similar
        .into_iter()
        .next()
        .ok_or_else(|| ResolveError::NotFound(display_name.to_string()))
}

/// Fetches one day from `source` and builds its reconciliation report.
pub fn check_day<S>(
    source: &S,
    user_id: &str,
    date: NaiveDate,
    tolerance: &Tolerance,
) -> Result<ReconciliationReport, S::Error>
where
    S: DaySource + ?Sized,
{
    let entries = source.fetch_entries(user_id, date)?;
    let summary = source.fetch_summary(user_id, date)?;
    tracing::debug!(
        user_id,
        %date,
        entries = entries.len(),
        has_summary = summary.is_some(),
        "fetched day"
    );
    Ok(ReconciliationReport::build(
        user_id, date, entries, summary, tolerance,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry_type::EntryType;
    use crate::reconcile::ComparisonStatus;
    use std::cell::RefCell;
    use std::fmt;

    #[derive(Debug)]
    struct Unreachable;

    impl fmt::Display for Unreachable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "backend unreachable")
        }
    }

    impl std::error::Error for Unreachable {}

    #[derive(Default)]
    struct Fixture {
        users: Vec<UserSettings>,
        entries: Vec<TimeEntry>,
        summaries: Vec<DailySummary>,
        lookups: RefCell<Vec<NameMatch>>,
        offline: bool,
    }

    impl DaySource for Fixture {
        type Error = Unreachable;

        fn fetch_entries(&self, user_id: &str, date: NaiveDate) -> Result<Vec<TimeEntry>, Unreachable> {
            if self.offline {
                return Err(Unreachable);
            }
            Ok(self
                .entries
                .iter()
                .filter(|e| e.user_id == user_id && e.date == date)
                .cloned()
                .collect())
        }

        fn fetch_summary(
            &self,
            user_id: &str,
            date: NaiveDate,
        ) -> Result<Option<DailySummary>, Unreachable> {
            Ok(self
                .summaries
                .iter()
                .find(|s| s.user_id == user_id && s.date == date)
                .cloned())
        }
    }

    impl UserDirectory for Fixture {
        type Error = Unreachable;

        fn find_users(
            &self,
            display_name: &str,
            matching: NameMatch,
        ) -> Result<Vec<UserSettings>, Unreachable> {
            if self.offline {
                return Err(Unreachable);
            }
            self.lookups.borrow_mut().push(matching);
            let needle = display_name.to_lowercase();
            Ok(self
                .users
                .iter()
                .filter(|u| match matching {
                    NameMatch::Exact => u.display_name == display_name,
                    NameMatch::Contains => u.display_name.to_lowercase().contains(&needle),
                })
                .cloned()
                .collect())
        }
    }

    fn user(id: &str, name: &str) -> UserSettings {
        UserSettings {
            user_id: id.to_string(),
            display_name: name.to_string(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
    }

    #[test]
    fn exact_match_wins_without_fallback() {
        let fixture = Fixture {
            users: vec![user("u1", "Test-Installer 2"), user("u2", "Test-Installer")],
            ..Fixture::default()
        };

        let resolved = resolve_user(&fixture, "Test-Installer").unwrap();
        assert_eq!(resolved.user_id, "u2");
        assert_eq!(*fixture.lookups.borrow(), vec![NameMatch::Exact]);
    }

    #[test]
    fn falls_back_to_substring_match() {
        let fixture = Fixture {
            users: vec![user("u1", "Anna (test-installer)")],
            ..Fixture::default()
        };

        let resolved = resolve_user(&fixture, "Test-Installer").unwrap();
        assert_eq!(resolved.user_id, "u1");
        assert_eq!(
            *fixture.lookups.borrow(),
            vec![NameMatch::Exact, NameMatch::Contains]
        );
    }

    #[test]
    fn unknown_user_is_not_found() {
        let fixture = Fixture::default();
        let err = resolve_user(&fixture, "Nobody").unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(ref name) if name == "Nobody"));
        assert_eq!(err.to_string(), "user not found: Nobody");
    }

    #[test]
    fn lookup_failure_propagates() {
        let fixture = Fixture {
            offline: true,
            ..Fixture::default()
        };
        let err = resolve_user(&fixture, "Anyone").unwrap_err();
        assert!(matches!(err, ResolveError::Source(Unreachable)));
    }

    #[test]
    fn check_day_without_summary_has_no_baseline() {
        let fixture = Fixture {
            entries: vec![TimeEntry {
                calc_duration_minutes: Some(120),
                ..TimeEntry::new("e1", "u1", date(), EntryType::Work)
            }],
            ..Fixture::default()
        };

        let report = check_day(&fixture, "u1", date(), &Tolerance::default()).unwrap();
        assert_eq!(report.totals.work_minutes, 120);
        assert_eq!(
            report.reconciliation.work_minutes.status,
            ComparisonStatus::NoBaseline
        );
    }

    #[test]
    fn check_day_only_reads_requested_user_and_date() {
        let other_day = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let fixture = Fixture {
            entries: vec![
                TimeEntry {
                    calc_duration_minutes: Some(60),
                    ..TimeEntry::new("e1", "u1", date(), EntryType::Work)
                },
                TimeEntry {
                    calc_duration_minutes: Some(600),
                    ..TimeEntry::new("e2", "u2", date(), EntryType::Work)
                },
                TimeEntry {
                    calc_duration_minutes: Some(600),
                    ..TimeEntry::new("e3", "u1", other_day, EntryType::Work)
                },
            ],
            summaries: vec![DailySummary {
                total_work_minutes: Some(60.0),
                total_effective_minutes: Some(60.0),
                ..DailySummary::new("u1", date())
            }],
            ..Fixture::default()
        };

        let report = check_day(&fixture, "u1", date(), &Tolerance::default()).unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.totals.work_minutes, 60);
        assert!(!report.has_drift());
    }

    #[test]
    fn check_day_propagates_source_errors() {
        let fixture = Fixture {
            offline: true,
            ..Fixture::default()
        };
        assert!(check_day(&fixture, "u1", date(), &Tolerance::default()).is_err());
    }
}
