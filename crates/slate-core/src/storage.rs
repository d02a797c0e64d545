use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed reading stored key {key:?}")]
    Read {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("stored value under key {key:?} is malformed")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed encoding value for key {key:?}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed writing key {key:?}")]
    Write {
        key: String,
        #[source]
        source: io::Error,
    },
}

pub trait Storage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    #[tracing::instrument(skip(root))]
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).map_err(|source| StoreError::Write {
            key: root.display().to_string(),
            source,
        })?;
        info!(root = %root.display(), "opened file storage");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl Storage for FileStorage {
    #[tracing::instrument(skip(self))]
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(raw) => {
                debug!(key, bytes = raw.len(), "read stored value");
                Ok(Some(raw))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(key, "no stored value");
                Ok(None)
            }
            Err(source) => Err(StoreError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    #[tracing::instrument(skip(self, value))]
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            key: key.to_string(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&self.root).map_err(write_err)?;
        temp.write_all(value.as_bytes()).map_err(write_err)?;
        temp.flush().map_err(write_err)?;
        temp.persist(self.key_path(key))
            .map_err(|err| write_err(err.error))?;

        debug!(key, bytes = value.len(), "wrote stored value");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(|poisoned| {
            poisoned.into_inner()
        });
        Ok(values.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|poisoned| {
            poisoned.into_inner()
        });
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
