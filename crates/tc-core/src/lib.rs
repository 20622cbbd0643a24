//! Core domain logic for daily time accounting.
//!
//! This crate contains the fundamental types and logic for:
//! - Classification: mapping entry types to WORK, BREAK or OTHER
//! - Aggregation: net work minutes, break deductions and surcharge hours
//! - Reconciliation: comparing computed totals against a materialized summary
//! - Entry audit: detecting derived fields that disagree with their entry
//! - Formatting: signed `HH:MM` rendering of decimal hours
//!
//! Nothing here performs I/O; backends plug in through [`DaySource`] and
//! [`UserDirectory`].

mod aggregate;
pub mod audit;
mod batch;
pub mod duration;
pub mod entry_type;
pub mod model;
mod reconcile;
pub mod search;
mod source;

pub use aggregate::{DailyTotals, aggregate};
pub use audit::{EntryFinding, EntryIssue, audit_entries, audit_entry};
pub use batch::{DayInput, reconcile_many};
pub use duration::{format_hours, format_minutes, parse_duration};
pub use entry_type::{EntryClass, EntryType, classify};
pub use model::{DailySummary, TimeEntry, UserSettings};
pub use reconcile::{
    ComparisonStatus, FieldComparison, Reconciliation, ReconciliationReport, Tolerance, reconcile,
};
pub use search::SearchReport;
pub use source::{DaySource, NameMatch, ResolveError, UserDirectory, check_day, resolve_user};
