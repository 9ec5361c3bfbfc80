//! Configuration for PageStore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for a PageStore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Folder holding every store file
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── sequence.db          (per-table id counters)
    ///     ├── backup.db            (only while a commit is in flight)
    ///     └── {table}.{page}.db    (one file per page)
    pub data_dir: PathBuf,

    /// fsync every written file and its folder before returning
    pub sync_writes: bool,

    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Records per page used by [`crate::Table`] to map ids to pages
    pub page_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./pagestore_data"),
            sync_writes: true,
            page_size: 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Enable or disable fsync after each file write
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.config.sync_writes = sync;
        self
    }

    /// Set the number of records per page (must be at least 1)
    pub fn page_size(mut self, size: u64) -> Self {
        self.config.page_size = size.max(1);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
