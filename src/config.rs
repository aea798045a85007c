//! Lookout Configuration Module
//!
//! Config is stored in `~/.config/lookout/config.toml`.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`LOOKOUT_SERVER_URL`, `LOOKOUT_TOKEN`)
//! 2. Config file (`~/.config/lookout/config.toml`)
//! 3. Defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LookoutError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LookoutConfig {
    /// Agent server connection
    #[serde(default)]
    pub server: ServerConfig,

    /// Bounded cache capacities
    #[serde(default)]
    pub cache: CacheConfig,

    /// Search debounce settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Session history replay
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Base URL of the agent server (ws/http)
    pub url: Option<String>,

    /// Bearer token
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub max_log_entries: usize,
    pub max_diff_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_log_entries: 1000,
            max_diff_entries: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    /// Queries shorter than this clear results without searching
    pub min_query_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_len: 2,
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    pub page_size: usize,
    pub max_pages: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 20,
        }
    }
}

impl LookoutConfig {
    /// Get the config directory path
    ///
    /// Returns `~/.config/lookout/` on Unix, `%APPDATA%/lookout/` on Windows
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lookout")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from the default path
    ///
    /// Returns default config if file doesn't exist.
    /// Returns error if file exists but is malformed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| LookoutError::Config {
            reason: format!("Failed to read config file: {}", e),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| LookoutError::Config {
            reason: format!("Failed to parse config file: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration, creating the parent directory if needed
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| LookoutError::Config {
                    reason: format!("Failed to create config directory: {}", e),
                })?;
            }
        }

        let content = toml::to_string_pretty(self).map_err(|e| LookoutError::Config {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| LookoutError::Config {
            reason: format!("Failed to write config file: {}", e),
        })
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("LOOKOUT_SERVER_URL") {
            if !url.is_empty() {
                self.server.url = Some(url);
            }
        }

        if let Ok(token) = std::env::var("LOOKOUT_TOKEN") {
            if !token.is_empty() {
                self.server.token = Some(token);
            }
        }

        self
    }

    fn validate(&self) -> Result<()> {
        if self.history.page_size == 0 {
            return Err(LookoutError::Config {
                reason: "history.page_size must be at least 1".to_string(),
            });
        }
        if self.cache.max_log_entries == 0 {
            return Err(LookoutError::Config {
                reason: "cache.max_log_entries must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Mask a token for display
///
/// Shows first N chars + asterisks, e.g. "lk_live_***"
pub fn mask_token(token: &str, visible_chars: usize) -> String {
    if token.is_empty() {
        return String::new();
    }

    let visible: String = token.chars().take(visible_chars).collect();
    format!("{}***", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path_contains_lookout() {
        let path = LookoutConfig::config_path();
        assert!(path.to_string_lossy().contains("lookout"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = LookoutConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, LookoutConfig::default());
        assert_eq!(config.search.debounce(), Duration::from_millis(300));
        assert_eq!(config.search.min_query_len, 2);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nmax_log_entries = 50\n").unwrap();

        let config = LookoutConfig::load_from(&path).unwrap();
        assert_eq!(config.cache.max_log_entries, 50);
        assert_eq!(config.cache.max_diff_entries, 500);
        assert_eq!(config.history.page_size, 50);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache\nbroken").unwrap();

        let err = LookoutConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, LookoutError::Config { .. }));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[history]\npage_size = 0\n").unwrap();
        assert!(LookoutConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = LookoutConfig::default();
        config.server.url = Some("wss://agent.local:8080".into());
        config.save_to(&path).unwrap();

        let loaded = LookoutConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        env::set_var("LOOKOUT_SERVER_URL", "ws://override:9");
        env::set_var("LOOKOUT_TOKEN", "");

        let mut config = LookoutConfig::default();
        config.server.token = Some("from-file".into());
        let config = config.with_env();

        env::remove_var("LOOKOUT_SERVER_URL");
        env::remove_var("LOOKOUT_TOKEN");

        assert_eq!(config.server.url.as_deref(), Some("ws://override:9"));
        // empty env value does not clobber the file value
        assert_eq!(config.server.token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("lk_live_abcdef", 8), "lk_live_***");
        assert_eq!(mask_token("abc", 8), "abc***");
        assert_eq!(mask_token("", 8), "");
    }
}
