//! Page codec and merge
//!
//! A page on disk is a JSON array of `{"id": <int>, "data": <payload>}`
//! entries with unique ids. Loading turns it into an id-ordered map and
//! replays staged changes on top.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::changes::Change;
use crate::error::{Result, StoreError};
use crate::record::Record;

/// Resolved content of a page: id → record, ascending ids
pub type PageRecords = BTreeMap<i64, Record>;

/// Parse a raw page array into records
pub(crate) fn decode(table: &str, page: u64, raw: Value) -> Result<PageRecords> {
    let Value::Array(entries) = raw else {
        return Err(StoreError::PageNotArray {
            table: table.to_string(),
            page,
        });
    };

    let mut records = PageRecords::new();
    for entry in entries {
        let (id, data) = match entry {
            Value::Object(mut fields) => {
                let id = fields.get("id").and_then(Value::as_i64);
                let data = fields.remove("data");
                match (id, data) {
                    (Some(id), Some(data)) => (id, data),
                    _ => return Err(malformed(table, page)),
                }
            }
            _ => return Err(malformed(table, page)),
        };
        if records.insert(id, Record::new(data)).is_some() {
            return Err(StoreError::DuplicateId {
                table: table.to_string(),
                page,
                id,
            });
        }
    }
    Ok(records)
}

/// Replay staged changes in order
///
/// Delete of a missing id is a no-op. Update needs the id present,
/// insert needs it absent.
pub(crate) fn merge(
    table: &str,
    page: u64,
    records: &mut PageRecords,
    changes: &[Change],
) -> Result<()> {
    for change in changes {
        match change {
            Change::Delete { id } => {
                records.remove(id);
            }
            Change::Update { id, record } => match records.get_mut(id) {
                Some(slot) => *slot = record.clone(),
                None => {
                    return Err(StoreError::UpdateMissing {
                        table: table.to_string(),
                        page,
                        id: *id,
                    })
                }
            },
            Change::Insert { id, record } => {
                if records.contains_key(id) {
                    return Err(StoreError::InsertConflict {
                        table: table.to_string(),
                        page,
                        id: *id,
                    });
                }
                records.insert(*id, record.clone());
            }
        }
    }
    Ok(())
}

/// Serialize records back into a page array, ascending ids
pub(crate) fn encode(records: &PageRecords) -> Value {
    Value::Array(
        records
            .iter()
            .map(|(id, record)| json!({ "id": id, "data": record.value() }))
            .collect(),
    )
}

fn malformed(table: &str, page: u64) -> StoreError {
    StoreError::PageMalformed {
        table: table.to_string(),
        page,
    }
}
