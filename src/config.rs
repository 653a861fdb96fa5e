//! Application configuration.
//!
//! Handles loading, validating, and merging `unmark.toml`. Stock defaults are
//! the base layer; a user file overrides any subset of keys.
//!
//! ## Config File Location
//!
//! `unmark.toml` in the current directory, or any path given with
//! `--config`. A missing file means "all defaults".
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [api]
//! base_url = "https://api.jiangtaisheng.top"  # Account API (login, register)
//! timeout_secs = 10                           # Per-request timeout
//!
//! [parse]
//! mode = "fixture"                   # "fixture" (canned data) or "network"
//! base_url = "https://api.example.com"  # Parse oracle for mode = "network"
//!
//! [storage]
//! data_dir = ".unmark"               # History ledger and credentials
//!
//! [album]
//! dir = "album"                      # Where saved media lands
//!
//! [crop]
//! # output_dir = "/tmp/unmark"       # Crop results (default: system temp dir)
//! max_display_width = 327.0          # Preview box the --display sizes assume
//! max_display_height = 400.0
//! preset_height = 60.0               # Band height of the top/bottom presets
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [parse]
//! mode = "network"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::parse::SourceMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "unmark.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `unmark.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Account API settings.
    pub api: ApiConfig,
    /// Parse oracle selection.
    pub parse: ParseConfig,
    /// Local persisted state.
    pub storage: StorageConfig,
    /// Album directory.
    pub album: AlbumConfig,
    /// Local band removal.
    pub crop: CropConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }
        for (key, url) in [
            ("api.base_url", &self.api.base_url),
            ("parse.base_url", &self.parse.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with http:// or https://, got {url:?}"
                )));
            }
        }
        for (key, value) in [
            ("crop.max_display_width", self.crop.max_display_width),
            ("crop.max_display_height", self.crop.max_display_height),
            ("crop.preset_height", self.crop.preset_height),
        ] {
            if !(value > 0.0) {
                return Err(ConfigError::Validation(format!(
                    "{key} must be greater than 0"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.jiangtaisheng.top".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseConfig {
    /// `fixture` serves canned results; `network` calls `base_url`.
    pub mode: SourceMode,
    pub base_url: String,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Fixture,
            base_url: "https://api.example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".unmark"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlbumConfig {
    pub dir: PathBuf,
}

impl Default for AlbumConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("album"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CropConfig {
    /// Where crop results are written. When absent, `<system temp>/unmark`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    pub max_display_width: f64,
    pub max_display_height: f64,
    pub preset_height: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            max_display_width: 327.0,
            max_display_height: 400.0,
            preset_height: 60.0,
        }
    }
}

impl CropConfig {
    pub fn effective_output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("unmark"))
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path` (a missing file yields the defaults).
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_some() {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    resolve_config(overlay)
}

/// Returns a fully-commented stock `unmark.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# unmark configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Account API (login, register, auto-login)
# ---------------------------------------------------------------------------
[api]
base_url = "https://api.jiangtaisheng.top"

# Seconds before a request is abandoned. No automatic retry.
timeout_secs = 10

# ---------------------------------------------------------------------------
# Share-link parsing
# ---------------------------------------------------------------------------
[parse]
# "fixture" answers from built-in sample data without touching the network.
# "network" posts to {base_url}/api/parse.
mode = "fixture"
base_url = "https://api.example.com"

# ---------------------------------------------------------------------------
# Local state
# ---------------------------------------------------------------------------
[storage]
# History ledger and login credentials, one JSON file per key.
data_dir = ".unmark"

# ---------------------------------------------------------------------------
# Album
# ---------------------------------------------------------------------------
[album]
# Saved images and videos are copied here.
dir = "album"

# ---------------------------------------------------------------------------
# Band removal
# ---------------------------------------------------------------------------
[crop]
# Where results are written. Omit for <system temp dir>/unmark.
# output_dir = "/tmp/unmark"

# Preview box that --display sizes are measured against.
max_display_width = 327.0
max_display_height = 400.0

# Height of the top/bottom quick-select band, in preview units.
preset_height = 60.0
"##
}
