//! Configuration module for feeder.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::feed::retention::{retention_resolver, RetentionResolver};
use crate::feed::types::FeedSource;
use crate::{FeederError, Result};

/// Environment variable that overrides `settings.github_token`.
pub const GITHUB_TOKEN_ENV: &str = "FEEDER_GITHUB_TOKEN";

/// General settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsConfig {
    /// Default retention in days for sources without an override.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Path to the article cache. Defaults to the XDG cache directory.
    #[serde(default)]
    pub cache_file: Option<String>,
    /// Path to the read state. Defaults to the XDG data directory.
    #[serde(default)]
    pub state_file: Option<String>,
    /// Path to the bookmark file. Defaults to the XDG data directory.
    #[serde(default)]
    pub bookmark_file: Option<String>,
    /// Token for the GitHub API.
    #[serde(default)]
    pub github_token: Option<String>,
    /// Timezone for absolute timestamps (IANA name).
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_retention_days() -> u32 {
    7
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            cache_file: None,
            state_file: None,
            bookmark_file: None,
            github_token: None,
            timezone: default_timezone(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file, in addition to stderr.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Fetch configuration shared by the source adapters and the updater.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Read timeout in seconds.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Maximum number of sources fetched at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Base URL of the GitHub REST API.
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
    /// Number of releases requested per repository.
    #[serde(default = "default_github_per_page")]
    pub github_per_page: u32,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_read_timeout() -> u64 {
    20
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    5
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_concurrent() -> usize {
    5
}

fn default_github_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_per_page() -> u32 {
    25
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_redirects: default_max_redirects(),
            max_feed_size_bytes: default_max_feed_size(),
            max_concurrent: default_max_concurrent(),
            github_api_url: default_github_api_url(),
            github_per_page: default_github_per_page(),
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub settings: SettingsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Fetch configuration.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Configured sources.
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FeederError::Config(format!("reading config {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeederError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDER_GITHUB_TOKEN`: Override the GitHub token
    pub fn apply_env_overrides(&mut self) {
        self.apply_github_token(std::env::var(GITHUB_TOKEN_ENV).ok());
    }

    fn apply_github_token(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.settings.github_token = Some(token);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            return Err(FeederError::Config("no feeds configured".to_string()));
        }
        if self.settings.retention_days < 1 {
            return Err(FeederError::Config(
                "settings.retention_days must be at least 1".to_string(),
            ));
        }
        if self.fetch.max_concurrent < 1 {
            return Err(FeederError::Config(
                "fetch.max_concurrent must be at least 1".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for (i, feed) in self.feeds.iter().enumerate() {
            if feed.name.trim().is_empty() {
                return Err(FeederError::Config(format!("feed {} has no name", i + 1)));
            }
            if feed.url.trim().is_empty() {
                return Err(FeederError::Config(format!(
                    "feed {:?} has no url",
                    feed.name
                )));
            }
            if !seen.insert(feed.url.as_str()) {
                return Err(FeederError::Config(format!(
                    "feed url {:?} is configured more than once",
                    feed.url
                )));
            }
            if feed.retention_days == Some(0) {
                return Err(FeederError::Config(format!(
                    "feed {:?}: retention_days must be at least 1",
                    feed.name
                )));
            }
        }
        Ok(())
    }

    /// Default config location: `$XDG_CONFIG_HOME/feeder/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feeder")
            .join("config.toml")
    }

    /// Resolved path of the article cache.
    pub fn cache_path(&self) -> PathBuf {
        match &self.settings.cache_file {
            Some(path) if !path.is_empty() => expand_home(path),
            _ => dirs_next::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("feeder")
                .join("cache.json"),
        }
    }

    /// Resolved path of the read state.
    pub fn state_path(&self) -> PathBuf {
        match &self.settings.state_file {
            Some(path) if !path.is_empty() => expand_home(path),
            _ => dirs_next::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("feeder")
                .join("state.json"),
        }
    }

    /// Resolved path of the bookmark file.
    pub fn bookmark_path(&self) -> PathBuf {
        match &self.settings.bookmark_file {
            Some(path) if !path.is_empty() => expand_home(path),
            _ => dirs_next::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("feeder")
                .join("bookmarks.md"),
        }
    }

    /// GitHub token, if one is configured.
    pub fn github_token(&self) -> Option<&str> {
        self.settings
            .github_token
            .as_deref()
            .filter(|t| !t.is_empty())
    }

    /// Retention resolver bound to the configured global default.
    pub fn retention_resolver(&self) -> RetentionResolver {
        retention_resolver(self.settings.retention_days)
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[[feeds]]
name = "Go Blog"
url = "https://go.dev/blog/feed.atom"
"#;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.settings.retention_days, 7);
        assert!(config.settings.cache_file.is_none());
        assert!(config.settings.state_file.is_none());
        assert!(config.settings.bookmark_file.is_none());
        assert!(config.settings.github_token.is_none());
        assert_eq!(config.settings.timezone, "UTC");

        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());

        assert_eq!(config.fetch.connect_timeout_secs, 10);
        assert_eq!(config.fetch.read_timeout_secs, 20);
        assert_eq!(config.fetch.total_timeout_secs, 30);
        assert_eq!(config.fetch.max_redirects, 5);
        assert_eq!(config.fetch.max_feed_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.fetch.max_concurrent, 5);
        assert_eq!(config.fetch.github_api_url, "https://api.github.com");
        assert_eq!(config.fetch.github_per_page, 25);

        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[settings]
retention_days = 14
cache_file = "/tmp/feeder/cache.json"
state_file = "/tmp/feeder/state.json"
bookmark_file = "/tmp/feeder/bookmarks.md"
github_token = "ghp_test"
timezone = "Asia/Tokyo"

[logging]
level = "debug"
file = "/tmp/feeder/feeder.log"

[fetch]
connect_timeout_secs = 3
read_timeout_secs = 4
total_timeout_secs = 5
max_redirects = 2
max_feed_size_bytes = 1024
max_concurrent = 8
github_api_url = "http://localhost:9000"
github_per_page = 10

[[feeds]]
name = "Go Blog"
url = "https://go.dev/blog/feed.atom"
tag = "go"
retention_days = 30

[[feeds]]
name = "Go Releases"
url = "github:golang/go"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.settings.retention_days, 14);
        assert_eq!(config.cache_path(), PathBuf::from("/tmp/feeder/cache.json"));
        assert_eq!(config.state_path(), PathBuf::from("/tmp/feeder/state.json"));
        assert_eq!(config.bookmark_path(), PathBuf::from("/tmp/feeder/bookmarks.md"));
        assert_eq!(config.github_token(), Some("ghp_test"));
        assert_eq!(config.settings.timezone, "Asia/Tokyo");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file.as_deref(), Some("/tmp/feeder/feeder.log"));

        assert_eq!(config.fetch.connect_timeout_secs, 3);
        assert_eq!(config.fetch.max_concurrent, 8);
        assert_eq!(config.fetch.github_api_url, "http://localhost:9000");
        assert_eq!(config.fetch.github_per_page, 10);

        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0].tag.as_deref(), Some("go"));
        assert_eq!(config.feeds[0].retention_days, Some(30));
        assert!(config.feeds[1].is_github());

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[settings]
retention_days = 3

[[feeds]]
name = "Go Blog"
url = "https://go.dev/blog/feed.atom"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.settings.retention_days, 3);
        assert_eq!(config.settings.timezone, "UTC");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.fetch.max_concurrent, 5);
        assert_eq!(config.feeds.len(), 1);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = Config::parse("[settings\nretention_days = 3");
        assert!(matches!(result, Err(FeederError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/feeder/config.toml");
        assert!(matches!(result, Err(FeederError::Config(_))));
    }

    #[test]
    fn test_validate_minimal() {
        let config = Config::parse(MINIMAL).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_no_feeds() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no feeds configured"));
    }

    #[test]
    fn test_validate_zero_retention() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.settings.retention_days = 0;
        assert!(config.validate().is_err());

        let mut config = Config::parse(MINIMAL).unwrap();
        config.feeds[0].retention_days = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_name_or_url() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.feeds[0].name = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::parse(MINIMAL).unwrap();
        config.feeds[0].url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_url() {
        let mut config = Config::parse(MINIMAL).unwrap();
        let mut copy = config.feeds[0].clone();
        copy.name = "Go Blog again".to_string();
        config.feeds.push(copy);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.fetch.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_github_token_override() {
        let mut config = Config::parse(MINIMAL).unwrap();
        assert!(config.github_token().is_none());

        config.apply_github_token(Some("from-env".to_string()));
        assert_eq!(config.github_token(), Some("from-env"));

        // Empty values do not clear an existing token.
        config.apply_github_token(Some(String::new()));
        assert_eq!(config.github_token(), Some("from-env"));
    }

    #[test]
    fn test_empty_github_token_is_none() {
        let mut config = Config::parse(MINIMAL).unwrap();
        config.settings.github_token = Some(String::new());
        assert!(config.github_token().is_none());
    }

    #[test]
    fn test_retention_resolver() {
        let toml = r#"
[settings]
retention_days = 10

[[feeds]]
name = "A"
url = "https://a.example/feed"

[[feeds]]
name = "B"
url = "https://b.example/feed"
retention_days = 2
"#;
        let config = Config::parse(toml).unwrap();
        let resolve = config.retention_resolver();
        assert_eq!(resolve(&config.feeds[0]), 10);
        assert_eq!(resolve(&config.feeds[1]), 2);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_home("rel/path"), PathBuf::from("rel/path"));
        if let Some(home) = dirs_next::home_dir() {
            assert_eq!(expand_home("~/x/cache.json"), home.join("x/cache.json"));
        }
    }

    #[test]
    fn test_default_paths() {
        let config = Config::parse(MINIMAL).unwrap();
        assert!(config.cache_path().ends_with("feeder/cache.json"));
        assert!(config.state_path().ends_with("feeder/state.json"));
        assert!(config.bookmark_path().ends_with("feeder/bookmarks.md"));
        assert!(Config::default_path().ends_with("feeder/config.toml"));
    }

    #[test]
    fn test_bookmark_path_expands_home() {
        let toml = r#"
[settings]
bookmark_file = "~/notes/bookmarks.md"

[[feeds]]
name = "Go Blog"
url = "https://go.dev/blog/feed.atom"
"#;
        let config = Config::parse(toml).unwrap();
        if let Some(home) = dirs_next::home_dir() {
            assert_eq!(config.bookmark_path(), home.join("notes/bookmarks.md"));
        }
    }
}
