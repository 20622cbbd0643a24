//! Time entries, daily summaries and user settings as stored by the backend.
//!
//! Rows arrive from loosely typed sources (REST payloads, hand-written import
//! files), so numeric fields are read leniently: numbers and numeric strings
//! are accepted, anything else becomes `None` and counts as zero downstream.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::entry_type::EntryType;

/// One recorded interval or absence claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(deserialize_with = "lenient::string")]
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub kind: EntryType,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub calc_duration_minutes: Option<i64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub calc_surcharge_hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub surcharge: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_deleted: bool,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TimeEntry {
    /// Creates an active entry with every optional field unset.
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        date: NaiveDate,
        kind: EntryType,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            date,
            kind,
            start_time: None,
            end_time: None,
            hours: None,
            calc_duration_minutes: None,
            calc_surcharge_hours: None,
            surcharge: None,
            is_deleted: false,
            order_number: None,
            client_name: None,
            note: None,
        }
    }

    pub const fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Derived duration in minutes, zero when absent.
    pub fn duration_minutes(&self) -> i64 {
        self.calc_duration_minutes.unwrap_or(0)
    }

    /// Derived surcharge hours, zero when absent or not a finite number.
    pub fn surcharge_hours(&self) -> f64 {
        finite_or_zero(self.calc_surcharge_hours)
    }

    /// User-entered hours, zero when absent or not a finite number.
    pub fn hours_or_zero(&self) -> f64 {
        finite_or_zero(self.hours)
    }
}

/// Pre-aggregated daily totals produced outside this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    #[serde(deserialize_with = "lenient::string")]
    pub user_id: String,
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_work_minutes: Option<f64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_surcharge_hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub vacation_hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub sick_hours: Option<f64>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub total_effective_minutes: Option<f64>,
}

impl DailySummary {
    /// Creates a summary with every total unset.
    pub fn new(user_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            date,
            total_work_minutes: None,
            total_surcharge_hours: None,
            vacation_hours: None,
            sick_hours: None,
            total_effective_minutes: None,
        }
    }

    pub fn work_minutes(&self) -> f64 {
        finite_or_zero(self.total_work_minutes)
    }

    pub fn surcharge_hours(&self) -> f64 {
        finite_or_zero(self.total_surcharge_hours)
    }

    pub fn effective_minutes(&self) -> f64 {
        finite_or_zero(self.total_effective_minutes)
    }
}

/// Display settings of a user, used to resolve users by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    #[serde(deserialize_with = "lenient::string")]
    pub user_id: String,
    pub display_name: String,
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Forgiving deserializers for loosely typed rows.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(decimal_from_value))
    }

    pub fn integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.as_ref().and_then(|v| match v {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(round_to_integer)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(round_to_integer))
            }
            _ => None,
        }))
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Bool(b)) => b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
            Some(Value::String(s)) => matches!(s.trim(), "true" | "t" | "1"),
            _ => false,
        })
    }

    /// Accepts strings and numbers (some tables use integer ids).
    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        match value {
            Some(Value::String(s)) => Ok(s),
            Some(Value::Number(n)) => Ok(n.to_string()),
            None | Some(Value::Null) => Ok(String::new()),
            Some(other) => Err(serde::de::Error::custom(format!(
                "expected a string or number, got {other}"
            ))),
        }
    }

    fn decimal_from_value(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|n| n.is_finite())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn round_to_integer(value: f64) -> Option<i64> {
        value.is_finite().then(|| value.round() as i64)
    }
}
