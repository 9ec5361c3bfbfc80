//! Shared helpers for PageStore integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pagestore::{Config, Folder, MemoryFolder, Record, Result, Store, StorageBackend};
use serde_json::json;
use tempfile::TempDir;

// =============================================================================
// Store Setup
// =============================================================================

pub fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_writes(false)
        .build();
    let store = Store::open(config).unwrap();
    (temp_dir, store)
}

pub fn reopen(temp_dir: &TempDir) -> Store {
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .sync_writes(false)
        .build();
    Store::open(config).unwrap()
}

pub fn setup_memory_store() -> (Arc<MemoryFolder>, Store) {
    let folder = Arc::new(MemoryFolder::new());
    let store = Store::with_folder(Config::default(), folder.clone()).unwrap();
    (folder, store)
}

pub fn setup_faulty_store() -> (Arc<FaultyFolder>, Store) {
    let folder = Arc::new(FaultyFolder::new());
    let store = Store::with_folder(Config::default(), folder.clone()).unwrap();
    (folder, store)
}

// =============================================================================
// Records
// =============================================================================

pub fn person(name: &str) -> Record {
    Record::new(json!({ "name": name }))
}

pub fn phone(number: i64) -> Record {
    Record::new(json!({ "number": number }))
}

pub fn name_of(record: &Record) -> Result<String> {
    record.require_string("name")
}

pub fn number_of(record: &Record) -> Result<i64> {
    record.require_int("number")
}

pub fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort();
    items
}

/// Raw bytes of a file, `None` if absent
pub fn file_bytes(folder: &dyn Folder, name: &str) -> Option<Vec<u8>> {
    folder.read(name).unwrap()
}

pub fn backup_exists(folder: &dyn Folder) -> bool {
    file_bytes(folder, StorageBackend::BACKUP_FILE).is_some()
}

// =============================================================================
// Fault Injection
// =============================================================================

/// In-memory folder whose writes can be made to fail on demand
///
/// Write failures are per file kind. `crash_after` simulates a killed
/// process: after that many successful writes/deletes every further
/// write or delete fails until `heal` is called.
pub struct FaultyFolder {
    inner: MemoryFolder,
    pub sequence_working: AtomicBool,
    pub page_working: AtomicBool,
    pub backup_working: AtomicBool,
    pub delete_backup_working: AtomicBool,
    pub corrupt_backup: AtomicBool,
    writes_left: Mutex<Option<usize>>,
    file_writes_left: Mutex<BTreeMap<String, usize>>,
}

impl FaultyFolder {
    pub fn new() -> Self {
        Self {
            inner: MemoryFolder::new(),
            sequence_working: AtomicBool::new(true),
            page_working: AtomicBool::new(true),
            backup_working: AtomicBool::new(true),
            delete_backup_working: AtomicBool::new(true),
            corrupt_backup: AtomicBool::new(false),
            writes_left: Mutex::new(None),
            file_writes_left: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn set(flag: &AtomicBool, value: bool) {
        flag.store(value, Ordering::SeqCst);
    }

    /// Allow `writes` more writes/deletes, then fail everything
    pub fn crash_after(&self, writes: usize) {
        *self.writes_left.lock() = Some(writes);
    }

    /// Allow `writes` more writes of one file, then refuse them
    pub fn limit_file(&self, name: &str, writes: usize) {
        self.file_writes_left.lock().insert(name.to_string(), writes);
    }

    /// Lift the limit set by `limit_file`
    pub fn unlimit_file(&self, name: &str) {
        self.file_writes_left.lock().remove(name);
    }

    /// Clear every fault
    pub fn heal(&self) {
        *self.writes_left.lock() = None;
        self.file_writes_left.lock().clear();
        Self::set(&self.sequence_working, true);
        Self::set(&self.page_working, true);
        Self::set(&self.backup_working, true);
        Self::set(&self.delete_backup_working, true);
        Self::set(&self.corrupt_backup, false);
    }

    fn spend_write(&self) -> Result<()> {
        let mut left = self.writes_left.lock();
        match *left {
            Some(0) => Err(injected("process crashed")),
            Some(n) => {
                *left = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

fn injected(what: &str) -> pagestore::StoreError {
    io::Error::new(io::ErrorKind::Other, what.to_string()).into()
}

impl Folder for FaultyFolder {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read(name)
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.spend_write()?;
        if let Some(left) = self.file_writes_left.lock().get_mut(name) {
            if *left == 0 {
                return Err(injected("file write refused"));
            }
            *left -= 1;
        }
        let working = match name {
            StorageBackend::SEQUENCE_FILE => &self.sequence_working,
            StorageBackend::BACKUP_FILE => &self.backup_working,
            _ => &self.page_working,
        };
        if !working.load(Ordering::SeqCst) {
            return Err(injected("write refused"));
        }
        if name == StorageBackend::BACKUP_FILE && self.corrupt_backup.load(Ordering::SeqCst) {
            return self.inner.write(name, &data[..data.len() / 2]);
        }
        self.inner.write(name, data)
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.spend_write()?;
        let refused = !self.delete_backup_working.load(Ordering::SeqCst);
        if name == StorageBackend::BACKUP_FILE && refused {
            return Err(injected("delete refused"));
        }
        self.inner.delete(name)
    }

    fn list(&self) -> Result<Vec<String>> {
        self.inner.list()
    }
}
