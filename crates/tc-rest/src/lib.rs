//! PostgREST (Supabase REST) access to time entries and daily summaries.
//!
//! Reads three resources:
//! - `time_entries`: raw entries, soft-deleted rows included
//! - `view_daily_summary`: the materialized per-day aggregates
//! - `user_settings`: display names for user lookup
//!
//! Credentials are passed in through [`RestConfig`]; nothing here reads the
//! environment.

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tc_core::{DailySummary, DaySource, NameMatch, TimeEntry, UserDirectory, UserSettings};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const REST_PATH: &str = "rest/v1";
const ENTRIES_TABLE: &str = "time_entries";
const SUMMARY_VIEW: &str = "view_daily_summary";
const USERS_TABLE: &str = "user_settings";

/// REST client errors.
#[derive(Debug, Error)]
pub enum RestError {
    /// The configuration cannot be used.
    #[error("invalid REST configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Failed to start the runtime that drives blocking calls.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The summary view returned more than one row for a day.
    #[error("expected at most one summary row, got {0}")]
    MultipleSummaries(usize),
}

/// Connection settings for the REST backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Service or anon key sent as `apikey` and bearer token.
    pub service_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl RestConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            service_key: service_key.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestConfig")
            .field("url", &self.url)
            .field("service_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Async PostgREST client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Creates a client from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s), the key is blank or not a
    /// valid header value, or the HTTP client fails to build.
    pub fn new(config: &RestConfig) -> Result<Self, RestError> {
        let url = config.url.trim();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(RestError::InvalidConfig {
                reason: "url must start with http:// or https://",
            });
        }
        let key = config.service_key.trim();
        if key.is_empty() {
            return Err(RestError::InvalidConfig {
                reason: "service key cannot be empty",
            });
        }

        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(key).map_err(|_| RestError::InvalidConfig {
            reason: "service key contains invalid header characters",
        })?;
        api_key.set_sensitive(true);
        let mut bearer =
            HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| RestError::InvalidConfig {
                reason: "service key contains invalid header characters",
            })?;
        bearer.set_sensitive(true);
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(RestError::ClientBuild)?;

        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches all entries of a user's day, soft-deleted ones included.
    pub async fn fetch_entries(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<TimeEntry>, RestError> {
        self.get_rows(ENTRIES_TABLE, &day_filters("*", user_id, date))
            .await
    }

    /// Fetches the summary row of a user's day, if any.
    pub async fn fetch_summary(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, RestError> {
        let rows = self
            .get_rows(SUMMARY_VIEW, &day_filters("*", user_id, date))
            .await?;
        single_row(rows)
    }

    /// Finds users by display name.
    pub async fn find_users(
        &self,
        display_name: &str,
        matching: NameMatch,
    ) -> Result<Vec<UserSettings>, RestError> {
        self.get_rows(USERS_TABLE, &user_filters(display_name, matching))
            .await
    }

    async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RestError> {
        let url = table_url(&self.base_url, table);
        let response = self.http.get(&url).query(query).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RestError::Api {
                status: status.as_u16(),
                message: parse_api_error(&body).unwrap_or(body),
            });
        }

        let rows: Vec<T> = decode_rows(&body)?;
        tracing::debug!(table, rows = rows.len(), "fetched rows");
        Ok(rows)
    }
}

/// Blocking adapter that lets [`RestClient`] serve the synchronous read traits.
pub struct RestSource {
    client: RestClient,
    runtime: tokio::runtime::Runtime,
}

impl fmt::Debug for RestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestSource")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl RestSource {
    /// Creates the client and a current-thread runtime to drive it.
    ///
    /// Must not be called from within another async runtime.
    pub fn new(config: &RestConfig) -> Result<Self, RestError> {
        let client = RestClient::new(config)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(RestError::Runtime)?;
        Ok(Self { client, runtime })
    }
}

impl DaySource for RestSource {
    type Error = RestError;

    fn fetch_entries(&self, user_id: &str, date: NaiveDate) -> Result<Vec<TimeEntry>, RestError> {
        self.runtime
            .block_on(self.client.fetch_entries(user_id, date))
    }

    fn fetch_summary(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailySummary>, RestError> {
        self.runtime
            .block_on(self.client.fetch_summary(user_id, date))
    }
}

impl UserDirectory for RestSource {
    type Error = RestError;

    fn find_users(
        &self,
        display_name: &str,
        matching: NameMatch,
    ) -> Result<Vec<UserSettings>, RestError> {
        self.runtime
            .block_on(self.client.find_users(display_name, matching))
    }
}

fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/{REST_PATH}/{table}", base_url.trim_end_matches('/'))
}

fn day_filters(select: &str, user_id: &str, date: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("select", select.to_string()),
        ("user_id", format!("eq.{user_id}")),
        ("date", format!("eq.{}", date.format("%Y-%m-%d"))),
    ]
}

fn user_filters(display_name: &str, matching: NameMatch) -> Vec<(&'static str, String)> {
    let filter = match matching {
        NameMatch::Exact => format!("eq.{display_name}"),
        // PostgREST uses `*` as the LIKE wildcard in URLs.
        NameMatch::Contains => format!("ilike.*{}*", escape_like(display_name)),
    };
    vec![
        ("select", "user_id,display_name".to_string()),
        ("display_name", filter),
    ]
}

/// Escapes ILIKE metacharacters so the name matches literally.
///
/// PostgREST rewrites every `*` to `%` and offers no escape for it, so a
/// literal `*` degrades to the single-character wildcard `_`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '*' => escaped.push('_'),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn decode_rows<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, RestError> {
    serde_json::from_str(body).map_err(|err| RestError::InvalidResponse(err.to_string()))
}

fn single_row<T>(rows: Vec<T>) -> Result<Option<T>, RestError> {
    if rows.len() > 1 {
        return Err(RestError::MultipleSummaries(rows.len()));
    }
    Ok(rows.into_iter().next())
}

fn parse_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        message: String,
        #[serde(default)]
        details: Option<String>,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| match payload.details {
            Some(details) if !details.is_empty() => format!("{} ({details})", payload.message),
            _ => payload.message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_core::EntryType;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()
    }

    #[test]
    fn client_rejects_non_http_url() {
        let config = RestConfig::new("knawmx.supabase.co", "key");
        assert!(matches!(
            RestClient::new(&config),
            Err(RestError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn client_rejects_blank_key() {
        let config = RestConfig::new("https://example.supabase.co", "   ");
        assert!(matches!(
            RestClient::new(&config),
            Err(RestError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn client_rejects_key_with_newline() {
        let config = RestConfig::new("https://example.supabase.co", "abc\ndef");
        assert!(matches!(
            RestClient::new(&config),
            Err(RestError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn client_trims_trailing_slash() {
        let config = RestConfig::new("https://example.supabase.co/", "key");
        let client = RestClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://example.supabase.co");
    }

    #[test]
    fn debug_redacts_service_key() {
        let config = RestConfig::new("https://example.supabase.co", "secret-key");
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("[REDACTED]"));

        let source = RestSource::new(&config).unwrap();
        assert!(!format!("{source:?}").contains("secret-key"));
    }

    #[test]
    fn config_timeout_defaults_when_missing() {
        let config: RestConfig =
            serde_json::from_str(r#"{"url": "https://x.supabase.co", "service_key": "k"}"#)
                .unwrap();
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn builds_table_urls() {
        assert_eq!(
            table_url("https://x.supabase.co/", SUMMARY_VIEW),
            "https://x.supabase.co/rest/v1/view_daily_summary"
        );
    }

    #[test]
    fn day_filters_use_postgrest_operators() {
        assert_eq!(
            day_filters("*", "user-1", date()),
            vec![
                ("select", "*".to_string()),
                ("user_id", "eq.user-1".to_string()),
                ("date", "eq.2026-01-31".to_string()),
            ]
        );
    }

    #[test]
    fn user_filters_switch_between_eq_and_ilike() {
        assert_eq!(
            user_filters("Test-Installer", NameMatch::Exact)[1],
            ("display_name", "eq.Test-Installer".to_string())
        );
        assert_eq!(
            user_filters("Test-Installer", NameMatch::Contains)[1],
            ("display_name", "ilike.*Test-Installer*".to_string())
        );
    }

    #[test]
    fn contains_filter_escapes_wildcards() {
        assert_eq!(
            user_filters("100% Anna_B", NameMatch::Contains)[1],
            ("display_name", r"ilike.*100\% Anna\_B*".to_string())
        );
        assert_eq!(escape_like(r"a\b*c"), r"a\\b_c");
    }

    #[test]
    fn decodes_entry_rows() {
        let body = r#"[
            {"id": "8f1c", "user_id": "user-1", "date": "2026-01-31", "type": "warehouse",
             "start_time": "07:00:00", "end_time": "15:00:00", "hours": 8,
             "calc_duration_minutes": 480, "calc_surcharge_hours": null, "surcharge": 0,
             "is_deleted": false, "order_number": null, "client_name": "Lager", "note": "",
             "created_at": "2026-01-31T16:02:11.123+00:00"},
            {"id": "8f1d", "user_id": "user-1", "date": "2026-01-31", "type": "break",
             "calc_duration_minutes": 30, "is_deleted": true}
        ]"#;

        let rows: Vec<TimeEntry> = decode_rows(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].kind, EntryType::Warehouse);
        assert_eq!(rows[0].calc_surcharge_hours, None);
        assert!(rows[1].is_deleted);
    }

    #[test]
    fn decode_rejects_non_array_body() {
        let err = decode_rows::<TimeEntry>(r#"{"message": "oops"}"#).unwrap_err();
        assert!(matches!(err, RestError::InvalidResponse(_)));
    }

    #[test]
    fn single_row_allows_zero_or_one() {
        assert_eq!(single_row::<u8>(vec![]).unwrap(), None);
        assert_eq!(single_row(vec![7]).unwrap(), Some(7));
        assert!(matches!(
            single_row(vec![1, 2]),
            Err(RestError::MultipleSummaries(2))
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_request_error() {
        let config = RestConfig {
            timeout_secs: 2,
            ..RestConfig::new("http://127.0.0.1:9", "key")
        };
        let client = RestClient::new(&config).unwrap();

        let err = client.fetch_entries("user-1", date()).await.unwrap_err();
        assert!(matches!(err, RestError::Request(_)));
    }

    #[test]
    fn parses_postgrest_error_payload() {
        let body = r#"{"code": "42P01", "details": null, "hint": null,
            "message": "relation \"public.view_daily_summary\" does not exist"}"#;
        assert_eq!(
            parse_api_error(body).as_deref(),
            Some("relation \"public.view_daily_summary\" does not exist")
        );
        assert_eq!(parse_api_error("<html>"), None);
    }
}
