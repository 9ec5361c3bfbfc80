//! Storage Module
//!
//! Durable storage boundary: whole-file blobs inside one folder.
//!
//! ## Responsibilities
//! - Read/write/delete named blobs ([`Folder`])
//! - Name and encode the store files ([`StorageBackend`])
//! - Discover tables and pages from file names
//!
//! ## Folder Layout
//! ```text
//! ┌────────────────────────────────────────┐
//! │ sequence.db       {"person": 3, ...}   │
//! ├────────────────────────────────────────┤
//! │ person.0.db       [{"id":1,"data":..}] │
//! │ person.1.db       [...]                │
//! │ phone.0.db        [...]                │
//! ├────────────────────────────────────────┤
//! │ backup.db         only during commit   │
//! │                   (or after a crash)   │
//! └────────────────────────────────────────┘
//! ```
//!
//! The backend is not thread-safe on its own terms: every write happens
//! while the store's exclusive lock is held.

mod backend;
mod dir;
mod memory;

pub use backend::StorageBackend;
pub use dir::DirFolder;
pub use memory::MemoryFolder;

use crate::error::Result;

/// A flat folder of named blobs
///
/// Implementations only move bytes around; they never interpret them.
/// Missing files are reported as `Ok(None)` on read and ignored on delete.
pub trait Folder: Send + Sync {
    /// Read a whole file, `None` if it does not exist
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Replace a whole file
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Remove a file (absent files are fine)
    fn delete(&self, name: &str) -> Result<()>;

    /// Names of all files in the folder
    fn list(&self) -> Result<Vec<String>>;
}
