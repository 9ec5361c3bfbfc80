//! Store Module
//!
//! The gate every caller goes through to get a view of the store.
//!
//! ## Responsibilities
//! - Own the reader/writer lock and the closed flag
//! - Replay a leftover backup before handing out any view
//! - Hand out [`Reader`]s (shared) and [`Writer`]s (exclusive)
//! - Run callback-form transactions with commit / revert handling

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::{debug, info};

use crate::backup::{Restore, RestoreResult};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::reader::Reader;
use crate::storage::{DirFolder, Folder, StorageBackend};
use crate::table::Table;
use crate::writer::Writer;

/// An embedded paged record store
///
/// ## Concurrency Model: Multiple-Reader / Single-Writer
///
/// - **Readers** share `lock`; any number may be open at once.
/// - **A writer** holds `lock` exclusively; no reader or other writer
///   runs beside it.
/// - **Restore check** runs before every acquisition under an upgradable
///   read: concurrent checks are serialized and writers are excluded, and
///   the lock is upgraded to exclusive only when a backup must be replayed.
///
/// The lock is not reentrant: a thread holding a writer must not ask the
/// same store for another view.
pub struct Store {
    /// Store configuration
    config: Config,

    /// Files of this store
    backend: StorageBackend,

    /// Readers share it, writers own it
    lock: RwLock<()>,

    /// Set once by `close`
    closed: AtomicBool,

    /// What opening replayed
    recovery: RestoreResult,
}

impl Store {
    /// Open or create a store in `config.data_dir`
    ///
    /// A backup left behind by a crashed commit is replayed before returning.
    pub fn open(config: Config) -> Result<Self> {
        let folder = DirFolder::open(&config.data_dir, config.sync_writes)?;
        Self::with_folder(config, Arc::new(folder))
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Open a store on any folder implementation
    ///
    /// `config.data_dir` is ignored; the folder decides where bytes live.
    pub fn with_folder(config: Config, folder: Arc<dyn Folder>) -> Result<Self> {
        let backend = StorageBackend::new(folder);
        let recovery = Restore::load(&backend)?.apply()?;
        if recovery.backup_found {
            info!(
                pages = recovery.pages_restored,
                sequence = recovery.sequence_restored,
                "recovered from interrupted commit"
            );
        }

        Ok(Self {
            config,
            backend,
            lock: RwLock::new(()),
            closed: AtomicBool::new(false),
            recovery,
        })
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Open a shared, read-only view
    pub fn read(&self) -> Result<Reader<'_>> {
        self.check_restore()?;
        let guard = self.lock.read();
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        debug!("reader acquired");
        Ok(Reader::new(&self.backend, guard))
    }

    /// Run `f` against a reader, closing it on every path
    pub fn read_with<'s, T, F>(&'s self, f: F) -> Result<T>
    where
        F: FnOnce(&Reader<'s>) -> Result<T>,
    {
        let reader = self.read()?;
        f(&reader)
    }

    /// Open the exclusive, read-write view
    pub fn write(&self) -> Result<Writer<'_>> {
        self.check_restore()?;
        let guard = self.lock.write();
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        debug!("writer acquired");
        Ok(Writer::new(&self.backend, guard))
    }

    /// Run `f` as one transaction
    ///
    /// On success the writer commits and done callbacks run, last registered
    /// first. If `f` or the commit fails, revert callbacks run in the same
    /// order and the error is returned.
    pub fn write_with<'s, T, F>(&'s self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Writer<'s>) -> Result<T>,
    {
        let mut writer = self.write()?;
        match f(&mut writer).and_then(|value| writer.commit().map(|()| value)) {
            Ok(value) => {
                for done in writer.take_dones().into_iter().rev() {
                    done();
                }
                Ok(value)
            }
            Err(e) => {
                for revert in writer.take_reverts().into_iter().rev() {
                    revert();
                }
                Err(e)
            }
        }
    }

    /// Mark the store unusable; later `read`/`write` calls fail
    ///
    /// Waits for open views to finish.
    pub fn close(&self) {
        let _guard = self.lock.write();
        self.closed.store(true, Ordering::SeqCst);
        info!("store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Replay a leftover backup, if any, before a view is handed out
    fn check_restore(&self) -> Result<RestoreResult> {
        let guard = self.lock.upgradable_read();
        let restore = Restore::load(&self.backend)?;
        if restore.is_empty() {
            return Ok(RestoreResult::default());
        }
        let _exclusive = RwLockUpgradableReadGuard::upgrade(guard);
        restore.apply()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Accessor for a table using the configured page size
    pub fn table(&self, name: &str) -> Table {
        Table::new(name, self.config.page_size)
    }

    /// Get the storage backend
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Backup replay performed while opening
    pub fn recovery(&self) -> &RestoreResult {
        &self.recovery
    }
}
