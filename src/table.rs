//! Table accessor
//!
//! Convenience layer for the common layout where a record's page is
//! `id / page_size`. Callers who choose pages differently use the views
//! directly.

use crate::error::Result;
use crate::reader::StoreRead;
use crate::record::Record;
use crate::writer::Writer;

/// A named table with a fixed number of ids per page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    page_size: u64,
}

impl Table {
    pub fn new(name: impl Into<String>, page_size: u64) -> Self {
        Self {
            name: name.into(),
            page_size: page_size.max(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Page holding `id`; negative ids share page 0
    pub fn page_of(&self, id: i64) -> u64 {
        u64::try_from(id).unwrap_or(0) / self.page_size
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn get<R, T, D>(&self, view: &R, id: i64, decode: D) -> Result<T>
    where
        R: StoreRead,
        D: Fn(&Record) -> Result<T>,
    {
        view.get(&self.name, self.page_of(id), id, decode)
    }

    pub fn find<R, T, D>(&self, view: &R, id: i64, decode: D) -> Result<Option<T>>
    where
        R: StoreRead,
        D: Fn(&Record) -> Result<T>,
    {
        view.find(&self.name, self.page_of(id), id, decode)
    }

    pub fn exists<R>(&self, view: &R, id: i64) -> Result<bool>
    where
        R: StoreRead,
    {
        view.exists(&self.name, self.page_of(id), id)
    }

    /// Every record of the table, page by page
    pub fn all<R, T, D>(&self, view: &R, decode: D) -> Result<Vec<T>>
    where
        R: StoreRead,
        D: Fn(&Record) -> Result<T>,
    {
        view.list_all(&self.name, decode)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Issue the next id from the table's sequence
    pub fn next_id(&self, writer: &mut Writer<'_>) -> Result<i64> {
        writer.sequence(&self.name)
    }

    pub fn insert(&self, writer: &mut Writer<'_>, id: i64, record: Record) {
        writer.insert(&self.name, self.page_of(id), id, record);
    }

    pub fn update(&self, writer: &mut Writer<'_>, id: i64, record: Record) {
        writer.update(&self.name, self.page_of(id), id, record);
    }

    pub fn delete(&self, writer: &mut Writer<'_>, id: i64) {
        writer.delete(&self.name, self.page_of(id), id);
    }
}
