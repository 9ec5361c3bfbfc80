//! # PageStore
//!
//! An embedded, file-backed record store with:
//! - Named tables split into numbered pages of JSON records keyed by id
//! - Atomic multi-page commits through a pre-write backup file
//! - Automatic crash recovery on open and before every transaction
//! - Multi-reader / single-writer concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store (gate)                         │
//! │          restore check · RwLock · closed flag                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Reader    │          │   Writer    │
//!   │  (shared)   │          │ (exclusive) │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │ staged ChangeSet
//!          │                        ▼
//!          │                 ┌─────────────┐
//!          │                 │Backup/Restore│
//!          │                 └──────┬──────┘
//!          ▼                        ▼
//!   ┌─────────────────────────────────────┐
//!   │   StorageBackend  →  Folder (files) │
//!   └─────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pagestore::{Record, Store, StoreRead};
//! use serde_json::json;
//!
//! # fn main() -> pagestore::Result<()> {
//! let store = Store::open_path(std::path::Path::new("./data"))?;
//!
//! store.write_with(|w| {
//!     let id = w.sequence("person")?;
//!     w.insert("person", 0, id, Record::new(json!({ "name": "Ada" })));
//!     Ok(())
//! })?;
//!
//! let name = store.read_with(|r| r.get("person", 0, 1, |rec| rec.require_string("name")))?;
//! assert_eq!(name, "Ada");
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod storage;
pub mod record;
pub mod changes;
pub mod page;
pub mod backup;
pub mod reader;
pub mod writer;
pub mod store;
pub mod table;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RestoreError, Result, StoreError};
pub use config::Config;
pub use store::Store;
pub use reader::{Reader, StoreRead};
pub use writer::Writer;
pub use record::{Decode, Record, CLASS_ID};
pub use changes::{Change, ChangeSet};
pub use backup::{Backup, Restore, RestoreResult};
pub use storage::{DirFolder, Folder, MemoryFolder, StorageBackend};
pub use table::Table;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of PageStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
