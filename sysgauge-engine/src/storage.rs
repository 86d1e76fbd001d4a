//! Durable key/value storage backends.
//!
//! The history log lives under a single fixed key, serialized as one JSON
//! blob. Backends only move bytes; they know nothing about records.

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::error::StorageError;

/// Key under which the run history is stored.
pub const HISTORY_KEY: &str = "run-history";

/// Key reserved for the view layer's theme preference.
pub const THEME_KEY: &str = "theme";

/// A durable byte store addressed by fixed keys.
pub trait Storage: Send + Sync + Debug {
    /// Read the value for a key. Returns `Ok(None)` if nothing was stored yet.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replace the value for a key. Must not return before the bytes are durable.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;
}

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary file in the same directory which is synced and
/// then renamed over the target, so readers see either the old or the new
/// contents and never a torn file. The directory is synced after the rename
/// so the new entry itself survives a power loss.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a storage rooted at `dir`. The directory is created on first write.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Returns the directory holding the stored files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        sync_dir(&self.dir)?;
        Ok(())
    }
}

/// Flush a directory's entries to disk.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

/// Directory handles cannot be synced here; the rename is as durable as it gets.
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// In-process storage, lost when the process exits.
///
/// Writes can be switched off with [`MemoryStorage::reject_writes`] to
/// exercise the failure path of callers.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    reject_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail (`true`) or succeed again (`false`).
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Seed a key directly, bypassing the write check.
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.entries.lock().insert(key.to_string(), bytes.into());
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected("storage is read-only".to_string()));
        }
        self.entries.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
