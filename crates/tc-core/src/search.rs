//! Search results grouped per user, newest first.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{TimeEntry, UserSettings};

/// Name shown for entries whose user has no settings row.
pub const UNKNOWN_USER: &str = "Unknown";

/// Entries of one user within a search report.
#[derive(Debug, Clone, Serialize)]
pub struct UserGroup {
    pub user_id: String,
    pub display_name: String,
    /// Sum of the user-entered `hours` field.
    pub total_hours: f64,
    pub entries: Vec<TimeEntry>,
}

/// Search results grouped by user.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub query: String,
    pub total_entries: usize,
    pub groups: Vec<UserGroup>,
}

impl SearchReport {
    /// Sorts entries by date (newest first) and groups them by user.
    ///
    /// Groups appear in the order their user first shows up after sorting.
    pub fn build(mut entries: Vec<TimeEntry>, users: &[UserSettings], query: &str) -> Self {
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        let total_entries = entries.len();

        let names: HashMap<&str, &str> = users
            .iter()
            .map(|u| (u.user_id.as_str(), u.display_name.as_str()))
            .collect();

        let mut groups: Vec<UserGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for entry in entries {
            let slot = *index.entry(entry.user_id.clone()).or_insert_with(|| {
                groups.push(UserGroup {
                    user_id: entry.user_id.clone(),
                    display_name: names
                        .get(entry.user_id.as_str())
                        .copied()
                        .unwrap_or(UNKNOWN_USER)
                        .to_string(),
                    total_hours: 0.0,
                    entries: Vec::new(),
                });
                groups.len() - 1
            });
            let group = &mut groups[slot];
            group.total_hours += entry.hours_or_zero();
            group.entries.push(entry);
        }

        Self {
            query: query.to_string(),
            total_entries,
            groups,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_entries == 0
    }
}
