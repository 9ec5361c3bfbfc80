//! In-memory folder for tests and throwaway stores.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::error::Result;

use super::Folder;

/// A [`Folder`] kept entirely in memory
///
/// All data is lost when the folder is dropped.
#[derive(Debug, Default)]
pub struct MemoryFolder {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryFolder {
    /// Create an empty folder
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a file with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.files.read().contains_key(name)
    }

    /// Number of files currently stored
    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }
}

impl Folder for MemoryFolder {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.read().get(name).cloned())
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.files.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.files.write().remove(name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(self.files.read().keys().cloned().collect())
    }
}
