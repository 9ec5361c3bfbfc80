//! Reader
//!
//! Read operations shared by both views of the store.
//!
//! ## Responsibilities
//! - Discover tables and pages (on disk ∪ staged)
//! - Load a page and merge the view's staged changes on top
//! - Lookup, listing, filtering and breadth-first graph loads
//!
//! Everything is provided by [`StoreRead`]; a view only has to say where its
//! files live and which changes it has staged. A [`Reader`] has none, a
//! [`crate::Writer`] sees its own.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use parking_lot::RwLockReadGuard;
use serde_json::Value;
use tracing::debug;

use crate::changes::ChangeSet;
use crate::error::{Result, StoreError};
use crate::page::{self, PageRecords};
use crate::record::Record;
use crate::storage::StorageBackend;

/// Read capability of a store view
pub trait StoreRead {
    /// Files backing this view
    fn backend(&self) -> &StorageBackend;

    /// Changes staged by this view, if it can stage any
    fn staged(&self) -> Option<&ChangeSet>;

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Tables on disk plus tables with staged changes
    fn list_tables(&self) -> Result<BTreeSet<String>> {
        let mut tables = self.backend().list_tables()?;
        if let Some(staged) = self.staged() {
            tables.extend(staged.tables().map(str::to_string));
        }
        Ok(tables)
    }

    /// Pages of `table` on disk plus pages with staged changes
    fn list_pages(&self, table: &str) -> Result<BTreeSet<u64>> {
        let mut pages = self.backend().list_pages(table)?;
        if let Some(staged) = self.staged() {
            pages.extend(staged.pages(table));
        }
        Ok(pages)
    }

    // =========================================================================
    // Page Access
    // =========================================================================

    /// Resolved content of a page: on-disk records with staged changes replayed
    fn load(&self, table: &str, page: u64) -> Result<PageRecords> {
        let raw = self.backend().read_page(table, page)?;
        let mut records = page::decode(table, page, raw)?;
        if let Some(changes) = self.staged().and_then(|s| s.page_changes(table, page)) {
            page::merge(table, page, &mut records, changes)?;
        }
        Ok(records)
    }

    /// Ids present on a page, ascending
    fn list_ids(&self, table: &str, page: u64) -> Result<Vec<i64>> {
        Ok(self.load(table, page)?.into_keys().collect())
    }

    /// Decode the record under `id`, failing with [`StoreError::NotFound`]
    fn get<T, D>(&self, table: &str, page: u64, id: i64, decode: D) -> Result<T>
    where
        D: Fn(&Record) -> Result<T>,
    {
        self.find(table, page, id, decode)?.ok_or_else(|| StoreError::NotFound {
            table: table.to_string(),
            page,
            id,
        })
    }

    fn exists(&self, table: &str, page: u64, id: i64) -> Result<bool> {
        Ok(self.load(table, page)?.contains_key(&id))
    }

    /// Decode the record under `id`, `None` when absent
    fn find<T, D>(&self, table: &str, page: u64, id: i64, decode: D) -> Result<Option<T>>
    where
        D: Fn(&Record) -> Result<T>,
    {
        self.load(table, page)?.get(&id).map(decode).transpose()
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Decode every record of every page of `table`
    fn list_all<T, D>(&self, table: &str, decode: D) -> Result<Vec<T>>
    where
        D: Fn(&Record) -> Result<T>,
    {
        let mut items = Vec::new();
        for page in self.list_pages(table)? {
            for record in self.load(table, page)?.values() {
                items.push(decode(record)?);
            }
        }
        Ok(items)
    }

    /// Decode the records of a page the filter accepts
    ///
    /// A filter error counts as "no match".
    fn list_filtered<T, P, D>(
        &self,
        table: &str,
        page: u64,
        filter: P,
        decode: D,
    ) -> Result<Vec<T>>
    where
        P: Fn(i64, &Record) -> Result<bool>,
        D: Fn(&Record) -> Result<T>,
    {
        self.load(table, page)?
            .iter()
            .filter(|(id, record)| filter(**id, *record).unwrap_or(false))
            .map(|(_, record)| decode(record))
            .collect()
    }

    /// First record (by ascending id) the filter accepts
    fn find_first<T, P, D>(
        &self,
        table: &str,
        page: u64,
        filter: P,
        decode: D,
    ) -> Result<Option<T>>
    where
        P: Fn(i64, &Record) -> Result<bool>,
        D: Fn(&Record) -> Result<T>,
    {
        self.load(table, page)?
            .iter()
            .find(|(id, record)| filter(**id, *record).unwrap_or(false))
            .map(|(_, record)| decode(record))
            .transpose()
    }

    /// Breadth-first parent → child load
    ///
    /// Each parent picks a page and filters it; every decoded match is
    /// collected and its `children` are queued as further parents. Parents
    /// are processed once each, in FIFO order. A `children` error means the
    /// item has no children.
    fn deep<T, F, G, P, D, C>(
        &self,
        table: &str,
        page: G,
        filter: P,
        decode: D,
        children: C,
        start_with: Vec<F>,
    ) -> Result<Vec<T>>
    where
        G: Fn(&F) -> u64,
        P: Fn(i64, &Record, &F) -> Result<bool>,
        D: Fn(&Record) -> Result<T>,
        C: Fn(&T) -> Result<Vec<F>>,
    {
        let mut result = Vec::new();
        let mut parents: VecDeque<F> = start_with.into();

        while let Some(parent) = parents.pop_front() {
            let accept = |id, record: &Record| filter(id, record, &parent);
            let items = self.list_filtered(table, page(&parent), accept, &decode)?;
            for item in items {
                match children(&item) {
                    Ok(next) => parents.extend(next),
                    Err(e) => debug!(table, error = %e, "skipping children of item"),
                }
                result.push(item);
            }
        }
        Ok(result)
    }

    // =========================================================================
    // Sequences
    // =========================================================================

    /// Last value issued for `table` (0 if none), without bumping it
    fn last_sequence(&self, table: &str) -> Result<i64> {
        if let Some(sequences) = self.staged().and_then(ChangeSet::sequences) {
            return Ok(sequences.get(table).copied().unwrap_or(0));
        }
        Ok(read_sequences(self.backend())?.get(table).copied().unwrap_or(0))
    }
}

/// Parse the committed sequence map
pub(crate) fn read_sequences(backend: &StorageBackend) -> Result<BTreeMap<String, i64>> {
    let Value::Object(entries) = backend.read_sequence()? else {
        return Err(StoreError::SequenceMalformed);
    };
    entries
        .into_iter()
        .map(|(table, value)| {
            value
                .as_i64()
                .map(|n| (table, n))
                .ok_or(StoreError::SequenceMalformed)
        })
        .collect()
}

// =============================================================================
// Reader
// =============================================================================

/// Read-only view holding a shared lock on the store
///
/// Dropping (or closing) the reader releases the lock.
pub struct Reader<'a> {
    backend: &'a StorageBackend,
    _guard: RwLockReadGuard<'a, ()>,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(backend: &'a StorageBackend, guard: RwLockReadGuard<'a, ()>) -> Self {
        Self {
            backend,
            _guard: guard,
        }
    }

    /// Last committed value for `table`'s counter (0 if none)
    pub fn sequence(&self, table: &str) -> Result<i64> {
        self.last_sequence(table)
    }

    /// Release the shared lock
    pub fn close(self) {}
}

impl StoreRead for Reader<'_> {
    fn backend(&self) -> &StorageBackend {
        self.backend
    }

    fn staged(&self) -> Option<&ChangeSet> {
        None
    }
}
