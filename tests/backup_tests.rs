//! Tests for Backup and Restore
//!
//! These tests verify:
//! - Backups capture the current on-disk bytes of touched pages only
//! - Restore parses entries sorted by (table, page)
//! - Apply rewrites sequence and pages to their captured content
//! - Apply is idempotent, and a no-op without a backup
//! - Structural problems surface as specific restore errors

use std::sync::Arc;

use pagestore::{Backup, Folder, MemoryFolder, Restore, RestoreError, StorageBackend, StoreError};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_backend() -> (Arc<MemoryFolder>, StorageBackend) {
    let folder = Arc::new(MemoryFolder::new());
    let backend = StorageBackend::new(folder.clone());
    (folder, backend)
}

fn page(name: &str) -> Value {
    json!([{ "name": name }])
}

fn bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

fn restore_error(folder: &MemoryFolder, backend: &StorageBackend, backup: &[u8]) -> RestoreError {
    folder.write(StorageBackend::BACKUP_FILE, backup).unwrap();
    match Restore::load(backend).unwrap_err() {
        StoreError::Restore(e) => e,
        other => panic!("expected a restore error, got {other:?}"),
    }
}

// =============================================================================
// Backup Tests
// =============================================================================

#[test]
fn test_backup_one_page() {
    let (_folder, backend) = setup_backend();
    backend.write_page("a", 1, &page("test")).unwrap();

    let mut backup = Backup::new();
    backup.changed("a", 1);
    let value = backup.to_value(&backend).unwrap();

    assert_eq!(value["data"]["a"]["1"][0]["name"], "test");
    assert!(value.get("sequence").is_none());
}

#[test]
fn test_backup_many_pages() {
    let (_folder, backend) = setup_backend();
    backend.write_page("a", 1, &page("A")).unwrap();
    backend.write_page("b", 2, &page("B")).unwrap();
    backend.write_page("c", 3, &page("C")).unwrap();

    let mut backup = Backup::new();
    backup.changed("a", 1);
    backup.changed("c", 3);
    let value = backup.to_value(&backend).unwrap();

    assert_eq!(value["data"]["a"]["1"][0]["name"], "A");
    assert_eq!(value["data"]["c"]["3"][0]["name"], "C");
    assert!(value["data"].get("b").is_none());
}

#[test]
fn test_backup_of_missing_page_is_empty_array() {
    let (_folder, backend) = setup_backend();

    let mut backup = Backup::new();
    backup.changed("fresh", 0);
    let value = backup.to_value(&backend).unwrap();

    assert_eq!(value["data"]["fresh"]["0"], json!([]));
}

#[test]
fn test_backup_captures_sequence_only_when_touched() {
    let (_folder, backend) = setup_backend();
    backend.write_sequence(&json!({ "a": 7 })).unwrap();

    let mut backup = Backup::new();
    backup.sequence_changed();

    let value = backup.to_value(&backend).unwrap();
    assert_eq!(value["sequence"], json!({ "a": 7 }));
    assert_eq!(value["data"], json!({}));
}

// =============================================================================
// Restore Load Tests
// =============================================================================

#[test]
fn test_restore_without_backup_is_empty() {
    let (_folder, backend) = setup_backend();

    let restore = Restore::load(&backend).unwrap();

    assert!(restore.is_empty());
    assert!(restore.sequence().is_none());
    assert!(restore.pages().is_empty());
}

#[test]
fn test_restore_one_page() {
    let (_folder, backend) = setup_backend();
    let page_a1 = page("test");
    backend.write_page("a", 1, &page_a1).unwrap();

    let mut backup = Backup::new();
    backup.changed("a", 1);
    backend.write_backup(&backup.to_value(&backend).unwrap()).unwrap();

    let restore = Restore::load(&backend).unwrap();
    assert!(!restore.is_empty());
    assert!(restore.sequence().is_none());
    assert_eq!(restore.pages().len(), 1);
    assert_eq!(restore.pages()[0].table, "a");
    assert_eq!(restore.pages()[0].page, 1);
    assert_eq!(restore.pages()[0].data, bytes(&page_a1));
}

#[test]
fn test_restore_entries_sorted_by_table_then_page() {
    let (_folder, backend) = setup_backend();
    for (table, number) in [("b", 10), ("a", 3), ("b", 2), ("a", 1)] {
        backend.write_page(table, number, &page(&format!("{table}{number}"))).unwrap();
    }

    let mut backup = Backup::new();
    backup.changed("b", 10);
    backup.changed("a", 3);
    backup.changed("b", 2);
    backup.changed("a", 1);
    backend.write_backup(&backup.to_value(&backend).unwrap()).unwrap();

    let restore = Restore::load(&backend).unwrap();
    let order: Vec<_> = restore
        .pages()
        .iter()
        .map(|p| (p.table.as_str(), p.page))
        .collect();
    assert_eq!(order, vec![("a", 1), ("a", 3), ("b", 2), ("b", 10)]);
}

// =============================================================================
// Restore Apply Tests
// =============================================================================

#[test]
fn test_restore_apply() {
    let (_folder, backend) = setup_backend();
    let sequence = json!({ "a": 1 });
    let sequence_changed = json!({ "a": 2 });
    let page_a1 = page("1");
    let page_a2 = page("2");
    let page_a3 = page("3");
    backend.write_sequence(&sequence).unwrap();
    backend.write_page("a", 1, &page_a1).unwrap();
    backend.write_page("a", 2, &page_a2).unwrap();
    backend.write_page("a", 3, &page_a3).unwrap();

    let mut backup = Backup::new();
    backup.sequence_changed();
    backup.changed("a", 1);
    backup.changed("a", 3);
    backend.write_backup(&backup.to_value(&backend).unwrap()).unwrap();

    // Simulate a commit that got halfway
    backend.write_sequence(&sequence_changed).unwrap();
    backend.write_page("a", 1, &page_a2).unwrap();
    backend.write_page("a", 3, &page_a2).unwrap();

    let result = Restore::load(&backend).unwrap().apply().unwrap();
    assert!(result.backup_found);
    assert!(result.sequence_restored);
    assert_eq!(result.pages_restored, 2);

    assert_eq!(backend.read_sequence().unwrap(), sequence);
    assert_eq!(backend.read_page("a", 1).unwrap(), page_a1);
    assert_eq!(backend.read_page("a", 2).unwrap(), page_a2);
    assert_eq!(backend.read_page("a", 3).unwrap(), page_a3);
}

#[test]
fn test_restore_apply_does_not_delete_backup() {
    let (folder, backend) = setup_backend();
    let mut backup = Backup::new();
    backup.changed("a", 0);
    backend.write_backup(&backup.to_value(&backend).unwrap()).unwrap();

    Restore::load(&backend).unwrap().apply().unwrap();

    assert!(folder.contains(StorageBackend::BACKUP_FILE));
}

#[test]
fn test_restore_apply_without_backup_is_noop() {
    let (folder, backend) = setup_backend();

    let first = Restore::load(&backend).unwrap().apply().unwrap();
    let second = Restore::load(&backend).unwrap().apply().unwrap();

    assert!(!first.backup_found);
    assert!(!second.backup_found);
    assert_eq!(folder.file_count(), 0);
}

#[test]
fn test_restore_apply_twice_is_idempotent() {
    let (folder, backend) = setup_backend();
    backend.write_sequence(&json!({ "a": 4 })).unwrap();
    backend.write_page("a", 0, &page("old")).unwrap();

    let mut backup = Backup::new();
    backup.sequence_changed();
    backup.changed("a", 0);
    backend.write_backup(&backup.to_value(&backend).unwrap()).unwrap();
    backend.write_sequence(&json!({ "a": 5 })).unwrap();
    backend.write_page("a", 0, &page("new")).unwrap();

    Restore::load(&backend).unwrap().apply().unwrap();
    let once: Vec<_> = ["sequence.db", "a.0.db"]
        .iter()
        .map(|name| folder.read(name).unwrap())
        .collect();

    Restore::load(&backend).unwrap().apply().unwrap();
    let twice: Vec<_> = ["sequence.db", "a.0.db"]
        .iter()
        .map(|name| folder.read(name).unwrap())
        .collect();

    assert_eq!(once, twice);
    assert_eq!(backend.read_page("a", 0).unwrap(), page("old"));
}

// =============================================================================
// Restore Error Tests
// =============================================================================

#[test]
fn test_restore_rejects_unreadable_backup() {
    let (folder, backend) = setup_backend();

    let err = restore_error(&folder, &backend, b"{\"data\":");
    assert!(matches!(err, RestoreError::Unreadable(_)));
}

#[test]
fn test_restore_rejects_non_object_backup() {
    let (folder, backend) = setup_backend();

    let err = restore_error(&folder, &backend, b"[1, 2]");
    assert!(matches!(err, RestoreError::NotAnObject));
}

#[test]
fn test_restore_rejects_missing_data() {
    let (folder, backend) = setup_backend();

    let err = restore_error(&folder, &backend, b"{\"sequence\": {}}");
    assert!(matches!(err, RestoreError::MissingData));
}

#[test]
fn test_restore_rejects_data_not_object() {
    let (folder, backend) = setup_backend();

    let err = restore_error(&folder, &backend, b"{\"data\": []}");
    assert!(matches!(err, RestoreError::DataNotAnObject));
}

#[test]
fn test_restore_rejects_table_not_object() {
    let (folder, backend) = setup_backend();

    let err = restore_error(&folder, &backend, b"{\"data\": {\"person\": 3}}");
    assert!(matches!(err, RestoreError::TableNotAnObject(ref t) if t == "person"));
}

#[test]
fn test_restore_rejects_non_numeric_page_key() {
    let (folder, backend) = setup_backend();

    let err = restore_error(&folder, &backend, b"{\"data\": {\"person\": {\"one\": []}}}");
    assert!(matches!(
        err,
        RestoreError::PageKeyNotANumber { ref table, ref key } if table == "person" && key == "one"
    ));
}

#[test]
fn test_failed_restore_leaves_files_untouched() {
    let (folder, backend) = setup_backend();
    backend.write_page("a", 0, &page("current")).unwrap();
    folder
        .write(StorageBackend::BACKUP_FILE, b"{\"data\": {\"a\": {\"0\": [], \"x\": []}}}")
        .unwrap();

    assert!(Restore::load(&backend).is_err());
    assert_eq!(backend.read_page("a", 0).unwrap(), page("current"));
    assert!(folder.contains(StorageBackend::BACKUP_FILE));
}
