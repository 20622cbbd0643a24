//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use tc_core::Tolerance;
use tc_rest::RestConfig;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Thresholds below which differences count as matching.
    #[serde(default)]
    pub tolerance: Tolerance,

    /// REST backend used by `check --remote`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RestConfig>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // RestConfig redacts its own key.
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("tolerance", &self.tolerance)
            .field("remote", &self.remote)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("tc.db"),
            tolerance: Tolerance::default(),
            remote: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Self::file_layers(config_path);

        // TC_REMOTE__SERVICE_KEY -> remote.service_key
        figment = figment.merge(Env::prefixed("TC_").split("__"));

        figment.extract()
    }

    /// Defaults merged with the default and explicit config files.
    fn file_layers(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment
    }
}

/// Returns the platform-specific config directory for tc.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tc"))
}

/// Returns the platform-specific data directory for tc.
///
/// On Linux: `~/.local/share/tc`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("tc"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_tc() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "tc");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("tc.db"));
        assert_eq!(config.tolerance, Tolerance::default());
        assert!(config.remote.is_none());
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
database_path = "/srv/tc/tc.db"

[tolerance]
minutes = 2.5

[remote]
url = "https://example.supabase.co"
service_key = "service-role-key"
"#,
        )
        .unwrap();

        let config: Config = Config::file_layers(Some(&path)).extract().unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/tc/tc.db"));
        assert!((config.tolerance.minutes - 2.5).abs() < f64::EPSILON);
        assert!((config.tolerance.hours - 0.01).abs() < f64::EPSILON);

        let remote = config.remote.unwrap();
        assert_eq!(remote.url, "https://example.supabase.co");
        assert_eq!(remote.timeout_secs, 30);
    }

    #[test]
    fn test_debug_redacts_service_key() {
        let config = Config {
            remote: Some(RestConfig::new("https://example.supabase.co", "service-role-key")),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("service-role-key"));
        assert!(debug.contains("[REDACTED]"));
    }
}
