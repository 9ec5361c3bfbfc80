//! Staged Changes
//!
//! In-memory changes of one write transaction, grouped by page.
//!
//! ## Responsibilities
//! - Keep every staged change in staging order, per (table, page)
//! - Keep the staged sequence map once any counter was bumped
//! - Never validate at staging time: conflicts surface when pages merge
//!
//! ## Data Structure Choice
//! Nested BTreeMaps: table → page → Vec<Change>. Ordered keys give
//! deterministic commit order (tables by name, pages ascending).

use std::collections::BTreeMap;

use crate::record::Record;

/// A single staged change against a page
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Add a record under a new id
    Insert { id: i64, record: Record },

    /// Replace the record under an existing id
    Update { id: i64, record: Record },

    /// Remove the record under an id
    Delete { id: i64 },
}

impl Change {
    pub fn id(&self) -> i64 {
        match self {
            Change::Insert { id, .. } | Change::Update { id, .. } | Change::Delete { id } => *id,
        }
    }
}

/// Changes staged by one writer, not visible to anyone else
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// table → page → changes in staging order
    pages: BTreeMap<String, BTreeMap<u64, Vec<Change>>>,

    /// Full sequence map, present once any counter was bumped
    sequences: Option<BTreeMap<String, i64>>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change to the page's list
    pub fn stage(&mut self, table: &str, page: u64, change: Change) {
        self.pages
            .entry(table.to_string())
            .or_default()
            .entry(page)
            .or_default()
            .push(change);
    }

    /// Changes staged for one page, in staging order
    pub fn page_changes(&self, table: &str, page: u64) -> Option<&[Change]> {
        self.pages.get(table)?.get(&page).map(Vec::as_slice)
    }

    /// Tables with at least one staged page
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    /// Pages of `table` with staged changes
    pub fn pages(&self, table: &str) -> impl Iterator<Item = u64> + '_ {
        self.pages.get(table).into_iter().flat_map(|pages| pages.keys().copied())
    }

    /// Every touched (table, page), tables by name then pages ascending
    pub fn touched(&self) -> impl Iterator<Item = (&str, u64)> {
        self.pages
            .iter()
            .flat_map(|(table, pages)| pages.keys().map(move |page| (table.as_str(), *page)))
    }

    pub fn sequences(&self) -> Option<&BTreeMap<String, i64>> {
        self.sequences.as_ref()
    }

    pub(crate) fn set_sequences(&mut self, sequences: BTreeMap<String, i64>) {
        self.sequences = Some(sequences);
    }

    /// True when neither pages nor sequences were staged
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty() && self.sequences.is_none()
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.sequences = None;
    }
}
