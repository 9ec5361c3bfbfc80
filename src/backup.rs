//! Backup and Restore
//!
//! Crash safety for multi-page commits.
//!
//! ## Protocol
//! 1. Before a commit overwrites anything, [`Backup`] captures the current
//!    on-disk bytes of every page it touches (plus the sequence map, if a
//!    counter moved) into `backup.db`.
//! 2. The commit writes the new sequence and pages.
//! 3. Deleting `backup.db` is the commit point.
//!
//! A `backup.db` found at any later time means step 3 never happened:
//! [`Restore`] replays it, putting every captured file back.
//!
//! ## Backup Format
//! ```text
//! {
//!   "sequence": { "person": 3 },                 (only if touched)
//!   "data": {
//!     "person": { "0": [ {"id":1,"data":..} ] }  (pre-write page arrays)
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{RestoreError, Result};
use crate::storage::StorageBackend;

const SEQUENCE_KEY: &str = "sequence";
const DATA_KEY: &str = "data";

// =============================================================================
// Backup
// =============================================================================

/// Coordinates touched by a transaction, captured at commit time
#[derive(Debug, Default)]
pub struct Backup {
    pages: BTreeMap<String, BTreeSet<u64>>,
    sequence: bool,
}

impl Backup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a page as touched
    pub fn changed(&mut self, table: &str, page: u64) {
        self.pages.entry(table.to_string()).or_default().insert(page);
    }

    /// Mark the sequence map as touched
    pub fn sequence_changed(&mut self) {
        self.sequence = true;
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.sequence = false;
    }

    /// Build the backup object from what is on disk right now
    pub fn to_value(&self, backend: &StorageBackend) -> Result<Value> {
        let mut root = Map::new();
        if self.sequence {
            root.insert(SEQUENCE_KEY.to_string(), backend.read_sequence()?);
        }

        let mut data = Map::new();
        for (table, pages) in &self.pages {
            let mut contents = Map::new();
            for page in pages {
                contents.insert(page.to_string(), backend.read_page(table, *page)?);
            }
            data.insert(table.clone(), Value::Object(contents));
        }
        root.insert(DATA_KEY.to_string(), Value::Object(data));

        Ok(Value::Object(root))
    }
}

// =============================================================================
// Restore
// =============================================================================

/// One captured page of a backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePage {
    pub table: String,
    pub page: u64,
    pub data: Vec<u8>,
}

/// Result of replaying a backup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreResult {
    /// Whether a backup was present at all
    pub backup_found: bool,

    /// Whether the sequence file was rewritten
    pub sequence_restored: bool,

    /// Number of page files rewritten
    pub pages_restored: usize,
}

/// Parsed `backup.db`, ready to be replayed
///
/// Loading never writes; [`Restore::apply`] does. Neither deletes
/// `backup.db`: only a successful commit does that.
#[derive(Debug)]
pub struct Restore {
    backend: StorageBackend,
    found: bool,
    sequence: Option<Vec<u8>>,
    pages: Vec<RestorePage>,
}

impl Restore {
    /// Parse the backup currently on disk (empty holder if there is none)
    pub fn load(backend: &StorageBackend) -> Result<Self> {
        let mut restore = Self {
            backend: backend.clone(),
            found: false,
            sequence: None,
            pages: Vec::new(),
        };

        let Some(backup) = backend.read_backup()? else {
            return Ok(restore);
        };
        restore.found = true;

        let Value::Object(mut root) = backup else {
            return Err(RestoreError::NotAnObject.into());
        };

        if let Some(sequence) = root.remove(SEQUENCE_KEY) {
            let bytes = serde_json::to_vec(&sequence).map_err(|_| RestoreError::SequenceToBytes)?;
            restore.sequence = Some(bytes);
        }

        let data = root.remove(DATA_KEY).ok_or(RestoreError::MissingData)?;
        let Value::Object(tables) = data else {
            return Err(RestoreError::DataNotAnObject.into());
        };

        for (table, pages) in tables {
            let Value::Object(pages) = pages else {
                return Err(RestoreError::TableNotAnObject(table).into());
            };
            for (key, content) in pages {
                let Ok(page) = key.parse::<u64>() else {
                    return Err(RestoreError::PageKeyNotANumber { table, key }.into());
                };
                let data = serde_json::to_vec(&content).map_err(|_| RestoreError::PageToBytes {
                    table: table.clone(),
                    page,
                })?;
                restore.pages.push(RestorePage {
                    table: table.clone(),
                    page,
                    data,
                });
            }
        }

        restore
            .pages
            .sort_by(|a, b| a.table.cmp(&b.table).then(a.page.cmp(&b.page)));
        Ok(restore)
    }

    /// Whether no backup was on disk
    pub fn is_empty(&self) -> bool {
        !self.found
    }

    /// Captured sequence bytes, if the transaction touched a counter
    pub fn sequence(&self) -> Option<&[u8]> {
        self.sequence.as_deref()
    }

    /// Captured pages ordered by table name then page number
    pub fn pages(&self) -> &[RestorePage] {
        &self.pages
    }

    /// Rewrite the sequence and every captured page
    pub fn apply(&self) -> Result<RestoreResult> {
        let mut result = RestoreResult {
            backup_found: self.found,
            ..RestoreResult::default()
        };
        if !self.found {
            return Ok(result);
        }

        if let Some(bytes) = &self.sequence {
            let sequence: Value = serde_json::from_slice(bytes).map_err(|_| {
                RestoreError::SequenceUnreadable(String::from_utf8_lossy(bytes).into_owned())
            })?;
            self.backend
                .write_sequence(&sequence)
                .map_err(|e| RestoreError::SequenceWrite(e.to_string()))?;
            result.sequence_restored = true;
        }

        for entry in &self.pages {
            let content: Value =
                serde_json::from_slice(&entry.data).map_err(|_| RestoreError::PageUnreadable {
                    table: entry.table.clone(),
                    page: entry.page,
                    content: String::from_utf8_lossy(&entry.data).into_owned(),
                })?;
            self.backend
                .write_page(&entry.table, entry.page, &content)
                .map_err(|e| RestoreError::PageWrite {
                    table: entry.table.clone(),
                    page: entry.page,
                    reason: e.to_string(),
                })?;
            debug!(table = %entry.table, page = entry.page, "restored page");
            result.pages_restored += 1;
        }

        info!(
            pages = result.pages_restored,
            sequence = result.sequence_restored,
            "replayed backup"
        );
        Ok(result)
    }
}
