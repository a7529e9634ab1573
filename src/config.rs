//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.docflow.toml` files.

use crate::models::Recipient;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = ".docflow.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend connection settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Status polling settings.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Background refresh settings.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Share recipients grouped by department.
    #[serde(default)]
    pub directory: BTreeMap<String, Vec<Recipient>>,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend; endpoint paths are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User id sent with uploads and sharing requests.
    #[serde(default = "default_user_id")]
    pub user_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_id: default_user_id(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout() -> u64 {
    60 // uploads of large files go through the same client
}

fn default_user_id() -> String {
    "docflow-cli".to_string()
}

/// Status polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between status requests in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Max status requests while waiting for analysis.
    #[serde(default = "default_analysis_max_polls")]
    pub analysis_max_polls: u32,

    /// Max status requests while waiting for a GDPR check.
    #[serde(default = "default_gdpr_max_polls")]
    pub gdpr_max_polls: u32,

    /// Max status requests while waiting for sharing.
    #[serde(default = "default_sharing_max_polls")]
    pub sharing_max_polls: u32,

    /// Consecutive failed status requests tolerated before giving up.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            analysis_max_polls: default_analysis_max_polls(),
            gdpr_max_polls: default_gdpr_max_polls(),
            sharing_max_polls: default_sharing_max_polls(),
            max_consecutive_errors: default_max_consecutive_errors(),
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_analysis_max_polls() -> u32 {
    300 // 10 min at 2s
}

fn default_gdpr_max_polls() -> u32 {
    60 // 2 min at 2s
}

fn default_sharing_max_polls() -> u32 {
    150 // 5 min at 2s
}

fn default_max_consecutive_errors() -> u32 {
    10
}

/// Background refresh settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Approval list refresh period in seconds.
    #[serde(default = "default_approvals_seconds")]
    pub approvals_seconds: u64,

    /// Dashboard statistics refresh period in seconds.
    #[serde(default = "default_stats_seconds")]
    pub stats_seconds: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            approvals_seconds: default_approvals_seconds(),
            stats_seconds: default_stats_seconds(),
        }
    }
}

impl RefreshConfig {
    pub fn approvals_period(&self) -> Duration {
        Duration::from_secs(self.approvals_seconds.max(1))
    }

    pub fn stats_period(&self) -> Duration {
        Duration::from_secs(self.stats_seconds.max(1))
    }
}

fn default_approvals_seconds() -> u64 {
    5
}

fn default_stats_seconds() -> u64 {
    30
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Rows per page in document lists.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,

    /// Identity recorded as approver or rejecter.
    #[serde(default = "default_approver")]
    pub approver: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            approver: default_approver(),
        }
    }
}

fn default_items_per_page() -> u32 {
    crate::pagination::DEFAULT_ITEMS_PER_PAGE
}

fn default_approver() -> String {
    "admin@company.com".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.docflow.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their env vars) take precedence over the file.
    /// Only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.api.base_url = base_url.clone();
        }

        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        if let Some(ref approver) = args.approver {
            self.display.approver = approver.clone();
        }

        if let Some(interval) = args.poll_interval_ms {
            self.polling.interval_ms = interval;
        }
    }

    /// Recipients registered for a department, matched case-insensitively.
    pub fn department_recipients(&self, department: &str) -> Option<&[Recipient]> {
        self.directory
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(department.trim()))
            .map(|(_, recipients)| recipients.as_slice())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:5000");
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.polling.analysis_max_polls, 300);
        assert_eq!(config.polling.gdpr_max_polls, 60);
        assert_eq!(config.polling.max_consecutive_errors, 10);
        assert_eq!(config.refresh.approvals_seconds, 5);
        assert_eq!(config.refresh.stats_seconds, 30);
        assert_eq!(config.display.items_per_page, 12);
        assert!(config.directory.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[api]
base_url = "https://docs.example.com"
timeout_seconds = 15

[polling]
interval_ms = 500
gdpr_max_polls = 10

[display]
approver = "dpo@example.com"

[[directory.HR]]
name = "Lan"
email = "lan@example.com"

[[directory.HR]]
name = "Minh"
email = "minh@example.com"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.base_url, "https://docs.example.com");
        assert_eq!(config.api.timeout_seconds, 15);
        assert_eq!(config.api.user_id, "docflow-cli");
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.gdpr_max_polls, 10);
        assert_eq!(config.polling.analysis_max_polls, 300);
        assert_eq!(config.display.approver, "dpo@example.com");

        let hr = config.department_recipients("hr").unwrap();
        assert_eq!(hr.len(), 2);
        assert_eq!(hr[1].email, "minh@example.com");
        assert!(config.department_recipients("Finance").is_none());
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from_dir(dir.path()).unwrap().is_none());

        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILE_NAME)).unwrap();
        writeln!(file, "[refresh]\napprovals_seconds = 9").unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.refresh.approvals_seconds, 9);
        assert_eq!(config.refresh.stats_seconds, 30);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[api\nbase_url = 1").unwrap();
        assert!(Config::load_from_dir(dir.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[polling]"));
        assert!(toml_str.contains("[refresh]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.polling.sharing_max_polls, 150);
    }
}
