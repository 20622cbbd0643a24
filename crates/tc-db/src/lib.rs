//! Storage layer for time entries and daily summaries.
//!
//! Provides persistence for users, entries and summaries using `rusqlite`,
//! and implements the [`DaySource`] and [`UserDirectory`] read interfaces.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Batch reconciliation
//! therefore loads all days first and reconciles the snapshots in parallel.
//!
//! # Schema
//!
//! ## Date Format
//!
//! Dates are stored as TEXT in `YYYY-MM-DD` format, so lexicographic ordering
//! matches chronological ordering and range queries can compare strings.
//!
//! ## Soft Deletes
//!
//! Entries are never removed. `is_deleted` is set instead, and every read of a
//! day returns deleted rows too so callers can show them for auditing.
//!
//! ## Summaries
//!
//! `daily_summaries` holds the externally materialized per-day aggregates as
//! they were imported. Nothing in this crate recomputes them.

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use tc_core::{DailySummary, DaySource, EntryType, NameMatch, TimeEntry, UserDirectory, UserSettings};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQL function lowercasing text with Unicode rules; SQLite's `lower()` only folds ASCII.
const FOLD_CASE: &str = "fold_case";

const ENTRY_COLUMNS: &str = "
    id, user_id, date, type, start_time, end_time, hours, calc_duration_minutes,
    calc_surcharge_hours, surcharge, is_deleted, order_number, client_name, note
";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored date could not be parsed.
    #[error("invalid date for {row}: {value}")]
    DateParse {
        row: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Row counts shown by `tc status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreCounts {
    pub users: usize,
    pub entries: usize,
    pub deleted_entries: usize,
    pub summaries: usize,
}

/// A (user, date) pair that has entries or a summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDay {
    pub user_id: String,
    pub date: NaiveDate,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let db = Self::with_connection(Connection::open(path)?)?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, DbError> {
        conn.create_scalar_function(
            FOLD_CASE,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                Ok(match ctx.get_raw(0) {
                    ValueRef::Text(text) => Some(String::from_utf8_lossy(text).to_lowercase()),
                    _ => None,
                })
            },
        )?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS user_settings (
                user_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_user_settings_name ON user_settings(display_name);

            -- date: YYYY-MM-DD
            -- start_time/end_time: wall-clock text as recorded (HH:MM or HH:MM:SS)
            CREATE TABLE IF NOT EXISTS time_entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                type TEXT NOT NULL,
                start_time TEXT,
                end_time TEXT,
                hours REAL,
                calc_duration_minutes INTEGER,
                calc_surcharge_hours REAL,
                surcharge REAL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                order_number TEXT,
                client_name TEXT,
                note TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_time_entries_user_date ON time_entries(user_id, date);
            CREATE INDEX IF NOT EXISTS idx_time_entries_date ON time_entries(date);

            CREATE TABLE IF NOT EXISTS daily_summaries (
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                total_work_minutes REAL,
                total_surcharge_hours REAL,
                vacation_hours REAL,
                sick_hours REAL,
                total_effective_minutes REAL,
                PRIMARY KEY (user_id, date)
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts or replaces users by ID.
    pub fn upsert_users(&mut self, users: &[UserSettings]) -> Result<usize, DbError> {
        if users.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO user_settings (user_id, display_name) VALUES (?, ?)
                ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name
                ",
            )?;
            for user in users {
                written += stmt.execute(params![user.user_id, user.display_name])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Inserts or replaces entries by ID.
    pub fn upsert_entries(&mut self, entries: &[TimeEntry]) -> Result<usize, DbError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO time_entries ({ENTRY_COLUMNS})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ))?;
            for entry in entries {
                written += stmt.execute(params![
                    entry.id,
                    entry.user_id,
                    format_date(entry.date),
                    entry.kind.as_str(),
                    entry.start_time,
                    entry.end_time,
                    entry.hours,
                    entry.calc_duration_minutes,
                    entry.calc_surcharge_hours,
                    entry.surcharge,
                    entry.is_deleted,
                    entry.order_number,
                    entry.client_name,
                    entry.note,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(written, "upserted entries");
        Ok(written)
    }

    /// Inserts or replaces summaries by (user, date).
    pub fn upsert_summaries(&mut self, summaries: &[DailySummary]) -> Result<usize, DbError> {
        if summaries.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "
                INSERT OR REPLACE INTO daily_summaries
                (user_id, date, total_work_minutes, total_surcharge_hours, vacation_hours,
                 sick_hours, total_effective_minutes)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ",
            )?;
            for summary in summaries {
                written += stmt.execute(params![
                    summary.user_id,
                    format_date(summary.date),
                    summary.total_work_minutes,
                    summary.total_surcharge_hours,
                    summary.vacation_hours,
                    summary.sick_hours,
                    summary.total_effective_minutes,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(written, "upserted summaries");
        Ok(written)
    }

    /// Marks an entry as deleted. Returns false if no such entry exists.
    pub fn soft_delete_entry(&mut self, id: &str) -> Result<bool, DbError> {
        let updated = self
            .conn
            .execute("UPDATE time_entries SET is_deleted = 1 WHERE id = ?", [id])?;
        Ok(updated > 0)
    }

    /// Lists all entries of a user on a date, deleted ones included.
    pub fn entries_for_day(&self, user_id: &str, date: NaiveDate) -> Result<Vec<TimeEntry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries
             WHERE user_id = ? AND date = ?
             ORDER BY start_time IS NULL, start_time ASC, id ASC"
        ))?;
        let rows = stmt.query_map(params![user_id, format_date(date)], EntryRow::from_row)?;
        collect_entries(rows)
    }

    /// Returns the stored summary of a user's day, if any.
    pub fn summary_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, DbError> {
        let summary = self
            .conn
            .query_row(
                "
                SELECT total_work_minutes, total_surcharge_hours, vacation_hours,
                       sick_hours, total_effective_minutes
                FROM daily_summaries
                WHERE user_id = ? AND date = ?
                ",
                params![user_id, format_date(date)],
                |row| {
                    Ok(DailySummary {
                        total_work_minutes: row.get(0)?,
                        total_surcharge_hours: row.get(1)?,
                        vacation_hours: row.get(2)?,
                        sick_hours: row.get(3)?,
                        total_effective_minutes: row.get(4)?,
                        ..DailySummary::new(user_id, date)
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }

    /// Lists all users ordered by display name.
    pub fn list_users(&self) -> Result<Vec<UserSettings>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, display_name FROM user_settings ORDER BY display_name ASC, user_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserSettings {
                user_id: row.get(0)?,
                display_name: row.get(1)?,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Finds users by display name.
    pub fn find_users(
        &self,
        display_name: &str,
        matching: NameMatch,
    ) -> Result<Vec<UserSettings>, DbError> {
        let (sql, pattern) = match matching {
            NameMatch::Exact => (
                "SELECT user_id, display_name FROM user_settings
                 WHERE display_name = ?
                 ORDER BY user_id ASC",
                display_name.to_string(),
            ),
            NameMatch::Contains => (
                "SELECT user_id, display_name FROM user_settings
                 WHERE fold_case(display_name) LIKE ? ESCAPE '\\'
                 ORDER BY display_name ASC, user_id ASC",
                contains_pattern(display_name),
            ),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([pattern], |row| {
            Ok(UserSettings {
                user_id: row.get(0)?,
                display_name: row.get(1)?,
            })
        })?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Searches active entries whose client, order number or note contains `query`.
    ///
    /// Matching is case-insensitive, umlauts included.
    pub fn search_entries(&self, query: &str) -> Result<Vec<TimeEntry>, DbError> {
        let pattern = contains_pattern(query);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM time_entries
             WHERE is_deleted = 0
               AND (fold_case(client_name) LIKE ?1 ESCAPE '\\'
                    OR fold_case(order_number) LIKE ?1 ESCAPE '\\'
                    OR fold_case(note) LIKE ?1 ESCAPE '\\')
             ORDER BY date DESC, user_id ASC, start_time ASC, id ASC"
        ))?;
        let rows = stmt.query_map([pattern], EntryRow::from_row)?;
        collect_entries(rows)
    }

    /// Lists every (user, date) with entries or a summary in `[from, to]`.
    pub fn days_in_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<UserDay>, DbError> {
        if to < from {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT user_id, date FROM time_entries WHERE date >= ?1 AND date <= ?2
            UNION
            SELECT user_id, date FROM daily_summaries WHERE date >= ?1 AND date <= ?2
            ORDER BY date ASC, user_id ASC
            ",
        )?;
        let rows = stmt.query_map(params![format_date(from), format_date(to)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut days = Vec::new();
        for row in rows {
            let (user_id, date) = row?;
            let date = parse_date(&date, &user_id)?;
            days.push(UserDay { user_id, date });
        }
        Ok(days)
    }

    /// Counts stored rows.
    pub fn counts(&self) -> Result<StoreCounts, DbError> {
        let count = |sql: &str| -> Result<usize, DbError> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or(0))
        };
        Ok(StoreCounts {
            users: count("SELECT COUNT(*) FROM user_settings")?,
            entries: count("SELECT COUNT(*) FROM time_entries")?,
            deleted_entries: count("SELECT COUNT(*) FROM time_entries WHERE is_deleted != 0")?,
            summaries: count("SELECT COUNT(*) FROM daily_summaries")?,
        })
    }
}

impl DaySource for Database {
    type Error = DbError;

    fn fetch_entries(&self, user_id: &str, date: NaiveDate) -> Result<Vec<TimeEntry>, DbError> {
        self.entries_for_day(user_id, date)
    }

    fn fetch_summary(&self, user_id: &str, date: NaiveDate) -> Result<Option<DailySummary>, DbError> {
        self.summary_for_day(user_id, date)
    }
}

impl UserDirectory for Database {
    type Error = DbError;

    fn find_users(
        &self,
        display_name: &str,
        matching: NameMatch,
    ) -> Result<Vec<UserSettings>, DbError> {
        Self::find_users(self, display_name, matching)
    }
}

/// Entry as read from SQLite, before the date is parsed.
#[derive(Debug)]
struct EntryRow {
    id: String,
    user_id: String,
    date: String,
    kind: String,
    start_time: Option<String>,
    end_time: Option<String>,
    hours: Option<f64>,
    calc_duration_minutes: Option<i64>,
    calc_surcharge_hours: Option<f64>,
    surcharge: Option<f64>,
    is_deleted: bool,
    order_number: Option<String>,
    client_name: Option<String>,
    note: Option<String>,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            date: row.get(2)?,
            kind: row.get(3)?,
            start_time: row.get(4)?,
            end_time: row.get(5)?,
            hours: row.get(6)?,
            calc_duration_minutes: row.get(7)?,
            calc_surcharge_hours: row.get(8)?,
            surcharge: row.get(9)?,
            is_deleted: row.get(10)?,
            order_number: row.get(11)?,
            client_name: row.get(12)?,
            note: row.get(13)?,
        })
    }

    fn into_entry(self) -> Result<TimeEntry, DbError> {
        let date = parse_date(&self.date, &self.id)?;
        Ok(TimeEntry {
            id: self.id,
            user_id: self.user_id,
            date,
            kind: EntryType::from(self.kind.as_str()),
            start_time: self.start_time,
            end_time: self.end_time,
            hours: self.hours,
            calc_duration_minutes: self.calc_duration_minutes,
            calc_surcharge_hours: self.calc_surcharge_hours,
            surcharge: self.surcharge,
            is_deleted: self.is_deleted,
            order_number: self.order_number,
            client_name: self.client_name,
            note: self.note,
        })
    }
}

fn collect_entries<I>(rows: I) -> Result<Vec<TimeEntry>, DbError>
where
    I: Iterator<Item = rusqlite::Result<EntryRow>>,
{
    let mut entries = Vec::new();
    for row in rows {
        entries.push(row?.into_entry()?);
    }
    Ok(entries)
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str, row: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| DbError::DateParse {
        row: row.to_string(),
        value: value.to_string(),
        source,
    })
}

/// Builds a lowercase `LIKE` pattern matching `needle` anywhere.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
