//! File-backed [`DeviceStore`].
//!
//! The file is one TOML table per module, keyed by
//! [`ModuleKey::storage_key`]:
//!
//! ```toml
//! [water_module_last_device]
//! id = "C4:DE:E2:19:0A:41"
//! name = "Vanlink Water"
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{DeviceInfo, DeviceStore, ModuleKey, StorageError};

pub struct TomlDeviceStore {
    path: PathBuf,
    /// Serialises read-modify-write cycles on the file.
    write_lock: Mutex<()>,
}

impl TomlDeviceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file.  A missing file is empty.
    ///
    /// # Errors
    ///
    /// [`StorageError::Corrupt`] when the file does not parse.  `set` and
    /// `clear` propagate it and leave the file untouched.
    async fn read_table(&self) -> Result<toml::Table, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_table(&self, table: &toml::Table) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|source| StorageError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(table)?;
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| StorageError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl DeviceStore for TomlDeviceStore {
    async fn get(&self, key: ModuleKey) -> Result<Option<DeviceInfo>, StorageError> {
        let table = match self.read_table().await {
            Err(StorageError::Corrupt { path, source }) => {
                warn!(path = %path.display(), error = %source, "device store unreadable");
                return Ok(None);
            }
            other => other?,
        };
        let Some(entry) = table.get(&key.storage_key()) else {
            return Ok(None);
        };
        match entry.clone().try_into::<DeviceInfo>() {
            Ok(device) => Ok(Some(device)),
            Err(e) => {
                debug!(module = %key, error = %e, "corrupt device entry ignored");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: ModuleKey, device: DeviceInfo) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.read_table().await?;
        table.insert(key.storage_key(), toml::Value::try_from(&device)?);
        self.write_table(&table).await
    }

    async fn clear(&self, key: ModuleKey) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut table = self.read_table().await?;
        if table.remove(&key.storage_key()).is_none() {
            return Ok(());
        }
        self.write_table(&table).await
    }
}
