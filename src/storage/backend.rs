//! Storage Backend
//!
//! Names and encodes the store files on top of a [`Folder`].
//!
//! ## Responsibilities
//! - Read/write the sequence map, page arrays and the backup object as JSON
//! - Default missing pages to `[]` and a missing sequence to `{}`
//! - Discover tables and pages from `<table>.<page>.db` file names

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{RestoreError, Result, StoreError};

use super::Folder;

/// Typed access to the files of one store
#[derive(Clone)]
pub struct StorageBackend {
    folder: Arc<dyn Folder>,
}

impl StorageBackend {
    // =========================================================================
    // File Name Constants
    // =========================================================================
    pub const SEQUENCE_FILE: &'static str = "sequence.db";
    pub const BACKUP_FILE: &'static str = "backup.db";
    const PAGE_SUFFIX: &'static str = ".db";

    /// Wrap a folder
    pub fn new(folder: Arc<dyn Folder>) -> Self {
        Self { folder }
    }

    /// Get the underlying folder
    pub fn folder(&self) -> &Arc<dyn Folder> {
        &self.folder
    }

    // =========================================================================
    // Sequence
    // =========================================================================

    /// Read the sequence map, `{}` when no sequence was ever written
    pub fn read_sequence(&self) -> Result<Value> {
        match self.folder.read(Self::SEQUENCE_FILE)? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|_| StoreError::SequenceMalformed)
            }
            None => Ok(Value::Object(Map::new())),
        }
    }

    pub fn write_sequence(&self, sequence: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(sequence)?;
        self.folder.write(Self::SEQUENCE_FILE, &bytes)
    }

    // =========================================================================
    // Pages
    // =========================================================================

    /// Read a page, `[]` when the page file does not exist
    pub fn read_page(&self, table: &str, page: u64) -> Result<Value> {
        match self.folder.read(&Self::page_file_name(table, page))? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::PageUnreadable {
                table: table.to_string(),
                page,
                reason: e.to_string(),
            }),
            None => Ok(Value::Array(Vec::new())),
        }
    }

    pub fn write_page(&self, table: &str, page: u64, content: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(content)?;
        self.folder.write(&Self::page_file_name(table, page), &bytes)
    }

    // =========================================================================
    // Backup
    // =========================================================================

    /// Read the backup object, `None` when no commit is in flight
    pub fn read_backup(&self) -> Result<Option<Value>> {
        match self.folder.read(Self::BACKUP_FILE)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| RestoreError::Unreadable(e.to_string()).into()),
            None => Ok(None),
        }
    }

    pub fn has_backup(&self) -> Result<bool> {
        Ok(self.folder.read(Self::BACKUP_FILE)?.is_some())
    }

    pub fn write_backup(&self, backup: &Value) -> Result<()> {
        let bytes = serde_json::to_vec(backup)?;
        self.folder.write(Self::BACKUP_FILE, &bytes)
    }

    pub fn delete_backup(&self) -> Result<()> {
        self.folder.delete(Self::BACKUP_FILE)
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Names of every table with at least one page file
    pub fn list_tables(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .folder
            .list()?
            .iter()
            .filter_map(|name| Self::parse_page_file_name(name))
            .map(|(table, _)| table.to_string())
            .collect())
    }

    /// Page numbers with a file for `table`
    pub fn list_pages(&self, table: &str) -> Result<BTreeSet<u64>> {
        Ok(self
            .folder
            .list()?
            .iter()
            .filter_map(|name| Self::parse_page_file_name(name))
            .filter(|(name, _)| *name == table)
            .map(|(_, page)| page)
            .collect())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Generate the file name for a page
    fn page_file_name(table: &str, page: u64) -> String {
        format!("{}.{}{}", table, page, Self::PAGE_SUFFIX)
    }

    /// Parse table and page from a file name
    /// "person.12.db" → Some(("person", 12))
    fn parse_page_file_name(name: &str) -> Option<(&str, u64)> {
        let stem = name.strip_suffix(Self::PAGE_SUFFIX)?;
        let (table, digits) = stem.rsplit_once('.')?;
        if table.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some((table, digits.parse().ok()?))
    }
}

impl fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBackend").finish_non_exhaustive()
    }
}
