//! Records
//!
//! A record is the JSON payload stored under an id inside a page. The store
//! never looks inside it; these accessors are for caller decoders.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Field name callers use to tag polymorphic records
pub const CLASS_ID: &str = "classid";

/// Declared decoding capability for a record type
///
/// `T::decode` can be passed wherever a decoder closure is expected.
pub trait Decode: Sized {
    fn decode(record: &Record) -> Result<Self>;
}

/// A JSON payload stored in a page
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    value: Value,
}

impl Record {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Encode any serde type as a record
    pub fn from_serialize<T: Serialize>(item: &T) -> Result<Self> {
        Ok(Self::new(serde_json::to_value(item)?))
    }

    /// Decode the whole record through serde
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.value.clone())?)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    // =========================================================================
    // Required Fields
    // =========================================================================

    pub fn require_int(&self, name: &str) -> Result<i64> {
        self.get_int(name).ok_or_else(|| self.missing(name, "an integer"))
    }

    pub fn require_id(&self) -> Result<i64> {
        self.require_int("id")
    }

    pub fn require_class_id(&self) -> Result<i64> {
        self.require_int(CLASS_ID)
    }

    pub fn require_string(&self, name: &str) -> Result<String> {
        self.get_string(name).ok_or_else(|| self.missing(name, "a string"))
    }

    pub fn require_bool(&self, name: &str) -> Result<bool> {
        self.get_bool(name).ok_or_else(|| self.missing(name, "a boolean"))
    }

    /// JSON document stored as text in a string field
    pub fn require_json(&self, name: &str) -> Result<Value> {
        let text = self
            .field(name)
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(name, "a JSON string"))?;
        serde_json::from_str(text).map_err(|_| self.missing(name, "a JSON string"))
    }

    /// String field turned into `T` by a caller parser
    pub fn require_string_with<T, F>(&self, name: &str, parse: F) -> Result<T>
    where
        F: FnOnce(&str) -> Result<T>,
    {
        let text = self
            .field(name)
            .and_then(Value::as_str)
            .ok_or_else(|| self.missing(name, "a string"))?;
        parse(text)
    }

    /// Non-integer items are skipped
    pub fn require_int_array(&self, name: &str) -> Result<Vec<i64>> {
        self.get_int_array(name).ok_or_else(|| self.missing(name, "an array"))
    }

    /// Non-string items are skipped
    pub fn require_string_array(&self, name: &str) -> Result<Vec<String>> {
        let items = self.array(name).ok_or_else(|| self.missing(name, "an array"))?;
        Ok(items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
    }

    /// Items the mapper rejects (or maps to `None`) are skipped
    pub fn require_array<T, F>(&self, name: &str, map: F) -> Result<Vec<T>>
    where
        F: Fn(&Record) -> Result<Option<T>>,
    {
        let items = self.array(name).ok_or_else(|| self.missing(name, "an array"))?;
        Ok(items
            .iter()
            .filter_map(|v| map(&Record::new(v.clone())).ok().flatten())
            .collect())
    }

    /// Values the mapper rejects are skipped
    pub fn require_map<T, F>(&self, name: &str, map: F) -> Result<BTreeMap<String, T>>
    where
        F: Fn(&Record) -> Result<T>,
    {
        let object = self
            .field(name)
            .and_then(Value::as_object)
            .ok_or_else(|| self.missing(name, "an object"))?;
        Ok(object
            .iter()
            .filter_map(|(k, v)| map(&Record::new(v.clone())).ok().map(|t| (k.clone(), t)))
            .collect())
    }

    // =========================================================================
    // Optional Fields
    // =========================================================================

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.field(name)?.as_i64()
    }

    /// `-1` when the record carries no integer id
    pub fn get_id(&self) -> i64 {
        self.get_int("id").unwrap_or(-1)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.field(name)?.as_str().map(str::to_string)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.field(name)?.as_bool()
    }

    pub fn get_json(&self, name: &str) -> Option<Value> {
        serde_json::from_str(self.field(name)?.as_str()?).ok()
    }

    pub fn get_int_array(&self, name: &str) -> Option<Vec<i64>> {
        Some(self.array(name)?.iter().filter_map(Value::as_i64).collect())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn field(&self, name: &str) -> Option<&Value> {
        self.value.get(name)
    }

    fn array(&self, name: &str) -> Option<&Vec<Value>> {
        self.field(name)?.as_array()
    }

    fn missing(&self, name: &str, expected: &'static str) -> StoreError {
        StoreError::FieldRequired {
            field: name.to_string(),
            expected,
            record: self.to_string(),
        }
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
