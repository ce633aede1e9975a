//! JSON persistence in the `.storage/` directory
//!
//! Every file is wrapped in a versioned envelope:
//!
//! ```json
//! {
//!   "version": 1,
//!   "minor_version": 1,
//!   "key": "core.config_entries",
//!   "data": { ... }
//! }
//! ```

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported version for {key}: expected {expected}, found {found}")]
    UnsupportedVersion {
        key: String,
        expected: u32,
        found: u32,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    pub version: u32,
    pub minor_version: u32,
    pub key: String,
    pub data: T,
}

/// Data that lives under a fixed storage key
pub trait Storable: Serialize + DeserializeOwned {
    const KEY: &'static str;
    const VERSION: u32;
    const MINOR_VERSION: u32;
}

/// Handle on a `.storage/` directory
#[derive(Debug, Clone)]
pub struct Storage {
    storage_dir: PathBuf,
}

impl Storage {
    /// Storage rooted at `<config_dir>/.storage`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            storage_dir: config_dir.as_ref().join(".storage"),
        }
    }

    pub fn file_path(&self, key: &str) -> PathBuf {
        self.storage_dir.join(key)
    }

    /// Load `T`; `None` when nothing was saved yet
    ///
    /// Files with a different major version are refused. Older minor
    /// versions are read as-is since minor bumps only add defaulted fields.
    pub async fn load<T: Storable>(&self) -> StorageResult<Option<StorageFile<T>>> {
        let path = self.file_path(T::KEY);
        if !fs::try_exists(&path).await? {
            debug!("Storage file not found: {}", T::KEY);
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let file: StorageFile<T> = serde_json::from_str(&content)?;
        if file.version != T::VERSION {
            return Err(StorageError::UnsupportedVersion {
                key: T::KEY.to_string(),
                expected: T::VERSION,
                found: file.version,
            });
        }

        debug!(
            "Loaded storage file: {} (v{}.{})",
            T::KEY,
            file.version,
            file.minor_version
        );
        Ok(Some(file))
    }

    /// Save `data`, writing a temp file first and renaming it into place
    pub async fn save<T: Storable>(&self, data: &T) -> StorageResult<()> {
        fs::create_dir_all(&self.storage_dir).await?;

        let file = StorageFile {
            version: T::VERSION,
            minor_version: T::MINOR_VERSION,
            key: T::KEY.to_string(),
            data,
        };
        let content = serde_json::to_string_pretty(&file)?;

        let path = self.file_path(T::KEY);
        let temp_path = self.file_path(&format!("{}.tmp", T::KEY));
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &path).await?;

        debug!("Saved storage file: {}", T::KEY);
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.file_path(key);
        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
            debug!("Deleted storage file: {}", key);
        }
        Ok(())
    }
}
