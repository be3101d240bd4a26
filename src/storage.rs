//! Key/value storage that never takes the caller down with it.
//!
//! A [`StorageBackend`] reports every failure as a [`StorageError`]. [`SafeStorage`] wraps a
//! backend, logs those failures and hands back [`Unavailable`] instead, so callers can treat
//! storage as best effort.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{StorageError, Unavailable};

pub trait StorageBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&mut self, key: &str) -> Result<(), StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

/// Storage that lives as long as the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: BTreeMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> MemoryStorage {
        MemoryStorage::default()
    }

    /// Limits the summed byte length of all keys and values.
    pub fn with_quota(quota: usize) -> MemoryStorage {
        MemoryStorage {
            items: BTreeMap::new(),
            quota: Some(quota),
        }
    }

    fn used(&self) -> usize {
        self.items
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let replaced = self
                .items
                .get(key)
                .map_or(0, |previous| key.len() + previous.len());
            if self.used() - replaced + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded { quota });
            }
        }
        self.items.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        self.items.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.items.clear();
        Ok(())
    }
}

/// Storage persisted as a JSON object in a single file. The file is read on every access and
/// rewritten on every change; a missing file is an empty store.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> FileStorage {
        FileStorage {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(json) if json.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(error.into()),
        }
    }

    fn save(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.load()?;
        items.insert(key.to_owned(), value.to_owned());
        self.save(&items)
    }

    fn remove_item(&mut self, key: &str) -> Result<(), StorageError> {
        let mut items = self.load()?;
        if items.remove(key).is_some() {
            self.save(&items)?;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.save(&BTreeMap::new())
    }
}

/// Refuses everything, like a browser with storage turned off.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStorage;

impl StorageBackend for DisabledStorage {
    fn get_item(&self, _: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Disabled)
    }

    fn set_item(&mut self, _: &str, _: &str) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }

    fn remove_item(&mut self, _: &str) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        Err(StorageError::Disabled)
    }
}

#[derive(Debug, Clone)]
pub struct SafeStorage<B> {
    backend: B,
    name: &'static str,
}

pub type LocalStorage = SafeStorage<FileStorage>;
pub type SessionStorage = SafeStorage<MemoryStorage>;

impl SafeStorage<FileStorage> {
    pub fn local<P: AsRef<Path>>(path: P) -> LocalStorage {
        SafeStorage::new(FileStorage::new(path), "local storage")
    }
}

impl SafeStorage<MemoryStorage> {
    pub fn session() -> SessionStorage {
        SafeStorage::new(MemoryStorage::new(), "session storage")
    }
}

impl<B: StorageBackend> SafeStorage<B> {
    pub fn new(backend: B, name: &'static str) -> SafeStorage<B> {
        SafeStorage { backend, name }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>, Unavailable> {
        let result = self.backend.get_item(key);
        self.report(result)
    }

    pub fn set_item(&mut self, key: &str, value: &str) -> Result<(), Unavailable> {
        let result = self.backend.set_item(key, value);
        self.report(result)
    }

    pub fn remove_item(&mut self, key: &str) -> Result<(), Unavailable> {
        let result = self.backend.remove_item(key);
        self.report(result)
    }

    pub fn clear(&mut self) -> Result<(), Unavailable> {
        let result = self.backend.clear();
        self.report(result)
    }

    fn report<T>(&self, result: Result<T, StorageError>) -> Result<T, Unavailable> {
        result.map_err(|error| {
            log::warn!("{} is not available: {}", self.name, error);
            Unavailable
        })
    }
}
