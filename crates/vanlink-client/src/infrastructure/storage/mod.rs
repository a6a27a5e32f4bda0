//! Storage infrastructure: remembered devices and the configuration file.
//!
//! - **`config`** – [`config::ClientConfig`] read from and written to TOML.
//! - **`toml_store`** – [`toml_store::TomlDeviceStore`], the file-backed
//!   [`DeviceStore`].
//!
//! A [`DeviceStore`] remembers the last peripheral connected for each module
//! so the app can reconnect without scanning.  Entries are independent: a
//! corrupt one reads as absent and never hides the others.

pub mod config;
pub mod toml_store;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// Error type for device persistence.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error accessing device store at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid TOML.  Writes refuse to replace it.
    #[error("device store at {path} is not valid TOML: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize device store: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The module families a device can be remembered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKey {
    Water,
    Heater,
    Battery,
}

impl ModuleKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Heater => "heater",
            Self::Battery => "battery",
        }
    }

    /// Key the entry is stored under, e.g. `water_module_last_device`.
    pub fn storage_key(self) -> String {
        format!("{}_module_last_device", self.as_str())
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "water" => Ok(Self::Water),
            "heater" => Ok(Self::Heater),
            "battery" => Ok(Self::Battery),
            other => Err(format!("unknown module {other:?} (expected water, heater or battery)")),
        }
    }
}

/// A remembered peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Platform device id used to reconnect.
    pub id: String,
    /// Advertised name shown to the user.
    pub name: String,
}

#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get(&self, key: ModuleKey) -> Result<Option<DeviceInfo>, StorageError>;

    async fn set(&self, key: ModuleKey, device: DeviceInfo) -> Result<(), StorageError>;

    async fn clear(&self, key: ModuleKey) -> Result<(), StorageError>;
}

/// Process-local [`DeviceStore`].
#[derive(Default)]
pub struct MemoryDeviceStore {
    entries: Mutex<HashMap<ModuleKey, DeviceInfo>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get(&self, key: ModuleKey) -> Result<Option<DeviceInfo>, StorageError> {
        Ok(self.entries.lock().await.get(&key).cloned())
    }

    async fn set(&self, key: ModuleKey, device: DeviceInfo) -> Result<(), StorageError> {
        self.entries.lock().await.insert(key, device);
        Ok(())
    }

    async fn clear(&self, key: ModuleKey) -> Result<(), StorageError> {
        self.entries.lock().await.remove(&key);
        Ok(())
    }
}
