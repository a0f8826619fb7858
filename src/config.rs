//! Configuration module for the sync client.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `CODESYNC_` and use double
//! underscores to separate nested levels:
//! - `CODESYNC_WATCH__DEBOUNCE_MS=250` sets `watch.debounce_ms`
//! - `CODESYNC_API__BASE_URL=http://localhost:8000` sets `api.base_url`
//! - `CODESYNC_BOOTSTRAP__MAX_FILE_SIZE=1048576` sets `bootstrap.max_file_size`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::bootstrap::Visibility;

/// Environment variable that points at an alternative settings file.
pub const CONFIG_ENV: &str = "CODESYNC_CONFIG";

const ENV_PREFIX: &str = "CODESYNC_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Root directory holding mirrors, the diff buffer and the sync config
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Source tag stamped on every diff record
    #[serde(default = "default_source")]
    pub source: String,

    /// Branch name used when the branch cannot be resolved
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Remote service settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Repository bootstrap settings
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// File watcher settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// Base URL of the sync service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BootstrapConfig {
    /// Files larger than this are never mirrored or uploaded
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Visibility applied when a repository is synced without a user present
    #[serde(default = "default_daemon_visibility")]
    pub daemon_visibility: Visibility,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// How long a file must be quiet before its content change is diffed
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// Logging configuration with per-module level control.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-target overrides, e.g. `"codesync::router" = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".codesync")
}
fn default_source() -> String {
    "cli".to_string()
}
fn default_branch() -> String {
    "default".to_string()
}
fn default_base_url() -> String {
    "https://api.codesync.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_file_size() -> u64 {
    2 * 1024 * 1024
}
fn default_daemon_visibility() -> Visibility {
    Visibility::Private
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            root: default_root(),
            source: default_source(),
            default_branch: default_branch(),
            api: ApiConfig::default(),
            bootstrap: BootstrapConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            daemon_visibility: default_daemon_visibility(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// The settings file is `$CODESYNC_CONFIG` when set, otherwise
    /// `<default root>/settings.toml`. A missing file is not an error.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_root().join("settings.toml"));

        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honouring env overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting, single underscore stays
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config", "token"]).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file under the configured root.
    pub fn init_config_file(&self, force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = self.root.join("settings.toml");

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        self.save(&config_path)?;
        Ok(config_path)
    }

    /// Directory holding the one-time originals snapshots.
    pub fn originals_dir(&self) -> PathBuf {
        self.root.join("originals")
    }

    /// Directory holding the shadow mirrors.
    pub fn shadow_dir(&self) -> PathBuf {
        self.root.join("shadow")
    }

    /// Directory holding pending diff records.
    pub fn diffs_dir(&self) -> PathBuf {
        self.root.join(".diffs")
    }

    /// Path of the persisted sync config.
    pub fn sync_config_path(&self) -> PathBuf {
        self.root.join("config.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.version, 1);
        assert_eq!(settings.default_branch, "default");
        assert_eq!(settings.watch.debounce_ms, 500);
        assert_eq!(settings.bootstrap.daemon_visibility, Visibility::Private);
        assert!(settings.root.ends_with(".codesync"));
    }

    #[test]
    fn test_derived_paths() {
        let mut settings = Settings::default();
        settings.root = PathBuf::from("/tmp/cs");

        assert_eq!(settings.shadow_dir(), PathBuf::from("/tmp/cs/shadow"));
        assert_eq!(settings.originals_dir(), PathBuf::from("/tmp/cs/originals"));
        assert_eq!(settings.diffs_dir(), PathBuf::from("/tmp/cs/.diffs"));
        assert_eq!(settings.sync_config_path(), PathBuf::from("/tmp/cs/config.yml"));
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("settings.toml");

        let toml_content = r#"
root = "/var/lib/codesync"
source = "editor"

[watch]
debounce_ms = 50

[bootstrap]
daemon_visibility = "public"

[logging.modules]
router = "debug"
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.root, PathBuf::from("/var/lib/codesync"));
        assert_eq!(settings.source, "editor");
        assert_eq!(settings.watch.debounce_ms, 50);
        assert_eq!(settings.bootstrap.daemon_visibility, Visibility::Public);
        assert_eq!(settings.logging.modules["router"], "debug");
        // Untouched sections keep defaults
        assert_eq!(settings.api.timeout_secs, 10);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.watch.debounce_ms = 1234;
        settings.api.base_url = "http://localhost:9000".to_string();

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.watch.debounce_ms, 1234);
        assert_eq!(loaded.api.base_url, "http://localhost:9000");
    }

    #[test]
    fn test_init_config_file_refuses_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.root = temp_dir.path().to_path_buf();

        let path = settings.init_config_file(false).unwrap();
        assert!(path.exists());
        assert!(settings.init_config_file(false).is_err());
        assert!(settings.init_config_file(true).is_ok());
    }
}
