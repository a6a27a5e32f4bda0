//! TOML configuration for the client.
//!
//! Reads and writes [`ClientConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Vanlink\config.toml`
//! - Linux:    `~/.config/vanlink/config.toml`
//! - macOS:    `~/Library/Application Support/Vanlink/config.toml`
//!
//! Every field has a serde default, so a missing file, an empty file, or a
//! file written by an older version all load:
//!
//! ```toml
//! [general]
//! log_level = "info"
//!
//! [heater]
//! status_poll_ms = 2000
//!
//! [water]
//! default_auto_close_secs = 30
//!
//! [storage]
//! path = "devices.toml"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::drain_valve::DrainValveOptions;
use crate::application::heater_zone::HeaterZoneOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `APPDATA`, `XDG_CONFIG_HOME` nor `HOME` is set.
    #[error("no config directory for this platform")]
    NoPlatformConfigDir,

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub heater: HeaterConfig,
    #[serde(default)]
    pub water: WaterConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeaterConfig {
    /// `STATUS?` poll period per zone, in milliseconds.  0 disables polling.
    #[serde(default = "default_status_poll_ms")]
    pub status_poll_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterConfig {
    /// Valve auto-close delay shown until the valve reports its own.
    #[serde(default = "default_auto_close_secs")]
    pub default_auto_close_secs: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// File holding the last connected device per module.  Relative paths
    /// resolve against the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_status_poll_ms() -> u64 {
    2000
}
fn default_auto_close_secs() -> u32 {
    vanlink_core::domain::valve::DEFAULT_AUTO_CLOSE_SECS
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            status_poll_ms: default_status_poll_ms(),
        }
    }
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            default_auto_close_secs: default_auto_close_secs(),
        }
    }
}

impl ClientConfig {
    pub fn heater_zone_options(&self) -> HeaterZoneOptions {
        HeaterZoneOptions {
            status_poll: Duration::from_millis(self.heater.status_poll_ms),
        }
    }

    pub fn drain_valve_options(&self) -> DrainValveOptions {
        DrainValveOptions {
            default_auto_close_secs: self.water.default_auto_close_secs,
        }
    }

    /// Device store location: the configured path, resolved against
    /// `config_dir` when relative, or `devices.toml` inside it.
    pub fn device_store_path(&self, config_dir: &Path) -> PathBuf {
        match &self.storage.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => config_dir.join("devices.toml"),
        }
    }
}

// ── Files ─────────────────────────────────────────────────────────────────────

/// Vanlink's directory under the platform config root.
///
/// # Errors
///
/// [`ConfigError::NoPlatformConfigDir`] when the environment names no root.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let (root, leaf) = platform_root().ok_or(ConfigError::NoPlatformConfigDir)?;
    Ok(root.join(leaf))
}

/// `config.toml` inside [`config_dir`].
///
/// # Errors
///
/// Same as [`config_dir`].
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Reads `path`.  A file that does not exist yet yields the defaults.
///
/// # Errors
///
/// [`ConfigError::Io`] when the file exists but cannot be read,
/// [`ConfigError::Parse`] when it is not valid TOML for [`ClientConfig`].
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ClientConfig::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    Ok(toml::from_str(&content)?)
}

/// Writes `config` to `path`; missing parent directories are created.
///
/// # Errors
///
/// [`ConfigError::Io`] or [`ConfigError::Serialize`].
pub fn save_config_to(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    let io_error = |at: &Path| {
        let at = at.to_path_buf();
        move |source: std::io::Error| ConfigError::Io { path: at, source }
    };

    let encoded = toml::to_string_pretty(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    std::fs::write(path, encoded).map_err(io_error(path))
}

/// Platform config root and the directory name Vanlink uses under it.
fn platform_root() -> Option<(PathBuf, &'static str)> {
    let env_dir = |name: &str| std::env::var_os(name).map(PathBuf::from);

    if cfg!(target_os = "windows") {
        env_dir("APPDATA").map(|root| (root, "Vanlink"))
    } else if cfg!(target_os = "macos") {
        env_dir("HOME").map(|home| (home.join("Library/Application Support"), "Vanlink"))
    } else if cfg!(unix) {
        env_dir("XDG_CONFIG_HOME")
            .or_else(|| env_dir("HOME").map(|home| home.join(".config")))
            .map(|root| (root, "vanlink"))
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
