//! Writer
//!
//! Read-write view holding the exclusive lock on the store.
//!
//! ## Commit Protocol
//! ```text
//!   stage ──► merge all touched pages ──► write backup.db
//!                                              │
//!                  ┌───────────────────────────┘
//!                  ▼
//!   check backup parses ──► write sequence.db ──► write pages ──► delete backup.db
//!                                                                     (commit point)
//!   any failure after backup.db is written ──► replay backup.db, return the error
//!   backup.db still present at the next commit ──► replay it before merging
//! ```

use std::collections::BTreeMap;

use parking_lot::RwLockWriteGuard;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::backup::{Backup, Restore};
use crate::changes::{Change, ChangeSet};
use crate::error::{Result, StoreError};
use crate::page;
use crate::reader::{read_sequences, StoreRead};
use crate::record::Record;
use crate::storage::StorageBackend;

/// Merged page contents ready to be written: table → page → page array
pub type PageWrites = BTreeMap<String, BTreeMap<u64, Value>>;

/// Read-write view of the store
///
/// Staged changes are private to this writer. Reads through [`StoreRead`]
/// see them; other views never do. Dropping the writer without committing
/// discards them and releases the lock.
pub struct Writer<'a> {
    backend: &'a StorageBackend,

    /// Changes staged since the last commit
    changes: ChangeSet,

    /// Coordinates to capture before the next commit overwrites them
    backup: Backup,

    /// Run (last first) after a successful callback-form commit
    dones: Vec<Box<dyn FnOnce() + 'a>>,

    /// Run (last first) when a callback-form transaction fails
    reverts: Vec<Box<dyn FnOnce() + 'a>>,

    _guard: RwLockWriteGuard<'a, ()>,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(backend: &'a StorageBackend, guard: RwLockWriteGuard<'a, ()>) -> Self {
        Self {
            backend,
            changes: ChangeSet::new(),
            backup: Backup::new(),
            dones: Vec::new(),
            reverts: Vec::new(),
            _guard: guard,
        }
    }

    // =========================================================================
    // Staging
    // =========================================================================

    /// Issue the next id for `table`
    ///
    /// The bumped counter is staged; it reaches disk on commit.
    pub fn sequence(&mut self, table: &str) -> Result<i64> {
        let mut sequences = match self.changes.sequences() {
            Some(staged) => staged.clone(),
            None => read_sequences(self.backend)?,
        };
        let next = sequences
            .get(table)
            .copied()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| StoreError::SequenceExhausted(table.to_string()))?;
        sequences.insert(table.to_string(), next);
        self.changes.set_sequences(sequences);
        self.backup.sequence_changed();
        Ok(next)
    }

    /// Stage an insert; conflicts surface on the next load or commit
    pub fn insert(&mut self, table: &str, page: u64, id: i64, record: Record) {
        self.stage(table, page, Change::Insert { id, record });
    }

    /// Stage an update; a missing id surfaces on the next load or commit
    pub fn update(&mut self, table: &str, page: u64, id: i64, record: Record) {
        self.stage(table, page, Change::Update { id, record });
    }

    pub fn delete(&mut self, table: &str, page: u64, id: i64) {
        self.stage(table, page, Change::Delete { id });
    }

    fn stage(&mut self, table: &str, page: u64, change: Change) {
        self.changes.stage(table, page, change);
        self.backup.changed(table, page);
    }

    /// Register a callback for after a successful commit
    pub fn on_done(&mut self, done: impl FnOnce() + 'a) {
        self.dones.push(Box::new(done));
    }

    /// Register a callback for when the transaction fails
    pub fn on_revert(&mut self, revert: impl FnOnce() + 'a) {
        self.reverts.push(Box::new(revert));
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Target content of every touched page, ids ascending
    pub fn changes(&self) -> Result<PageWrites> {
        let mut writes = PageWrites::new();
        for (table, page) in self.changes.touched() {
            let records = self.load(table, page)?;
            writes
                .entry(table.to_string())
                .or_default()
                .insert(page, page::encode(&records));
        }
        Ok(writes)
    }

    /// Make every staged change durable, or none of them
    ///
    /// A merge conflict aborts before anything is written. Once `backup.db`
    /// is on disk, any failure replays it and the error is returned; if the
    /// replay fails too, its error is returned instead.
    ///
    /// A `backup.db` left by an earlier failed attempt holds the only good
    /// copy of the touched files, so it is replayed before pages are merged.
    /// If that replay fails the commit stops and the backup stays in place.
    pub fn commit(&mut self) -> Result<()> {
        if self.changes.is_empty() {
            return Ok(());
        }

        if self.backend.has_backup()? {
            warn!("replaying backup.db left by an earlier commit attempt");
            Restore::load(self.backend)?.apply()?;
        }

        let writes = self.changes()?;

        match self.write_through(&writes) {
            Ok(()) => {
                info!(
                    tables = writes.len(),
                    pages = writes.values().map(BTreeMap::len).sum::<usize>(),
                    sequence = self.changes.sequences().is_some(),
                    "committed"
                );
                self.changes.clear();
                self.backup.clear();
                Ok(())
            }
            Err(StoreError::RestoreNotWorking) => {
                error!("backup.db cannot be parsed back; leaving it for the next open");
                Err(StoreError::RestoreNotWorking)
            }
            Err(e) => {
                warn!(error = %e, "commit failed, rolling back");
                if let Err(restore_error) = Restore::load(self.backend).and_then(|r| r.apply()) {
                    error!(error = %restore_error, "rollback failed");
                    return Err(restore_error);
                }
                Err(e)
            }
        }
    }

    fn write_through(&self, writes: &PageWrites) -> Result<()> {
        // Step 1: Capture what is on disk now
        let snapshot = self.backup.to_value(self.backend)?;
        self.backend.write_backup(&snapshot)?;

        // Step 2: Recovery must be able to read what was just written
        if Restore::load(self.backend).is_err() {
            return Err(StoreError::RestoreNotWorking);
        }

        // Step 3: Overwrite sequence and pages
        if let Some(sequences) = self.changes.sequences() {
            self.backend.write_sequence(&serde_json::to_value(sequences)?)?;
        }

        for (table, pages) in writes {
            for (page, content) in pages {
                self.backend.write_page(table, *page, content)?;
                debug!(table = %table, page, "wrote page");
            }
        }

        // Step 4: Commit point
        self.backend.delete_backup()
    }

    /// Release the exclusive lock, discarding anything not committed
    pub fn close(self) {}

    pub(crate) fn take_dones(&mut self) -> Vec<Box<dyn FnOnce() + 'a>> {
        std::mem::take(&mut self.dones)
    }

    pub(crate) fn take_reverts(&mut self) -> Vec<Box<dyn FnOnce() + 'a>> {
        std::mem::take(&mut self.reverts)
    }
}

impl StoreRead for Writer<'_> {
    fn backend(&self) -> &StorageBackend {
        self.backend
    }

    fn staged(&self) -> Option<&ChangeSet> {
        Some(&self.changes)
    }
}
