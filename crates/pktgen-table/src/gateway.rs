//! Table gateway trait and the key/data value model it exchanges.
//!
//! Entries are addressed by a typed key tuple and carry a list of named data
//! fields. Tables whose data layout depends on a selector (the application
//! table's trigger type) take that selector as `data_type`.

use std::fmt;

use crate::error::TableResult;

/// A single data field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(u64),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<u64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(u64::from(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

/// Name and value of a data field.
pub type DataField = (String, FieldValue);

/// Ordered data fields of a table entry.
pub type Fields = Vec<DataField>;

/// Helper trait for working with data field collections.
pub trait FieldsExt {
    /// Gets the value for a field, if present.
    fn get_field(&self, field: &str) -> Option<&FieldValue>;

    /// Gets an integer field.
    fn get_int(&self, field: &str) -> Option<u64>;

    /// Gets a boolean field.
    fn get_bool(&self, field: &str) -> Option<bool>;

    /// Checks if a field exists.
    fn has_field(&self, field: &str) -> bool;

    /// Replaces fields with matching names and appends the rest.
    fn merge(&mut self, update: &[DataField]);
}

impl FieldsExt for Fields {
    fn get_field(&self, field: &str) -> Option<&FieldValue> {
        self.iter().find(|(f, _)| f == field).map(|(_, v)| v)
    }

    fn get_int(&self, field: &str) -> Option<u64> {
        self.get_field(field).and_then(FieldValue::as_int)
    }

    fn get_bool(&self, field: &str) -> Option<bool> {
        self.get_field(field).and_then(FieldValue::as_bool)
    }

    fn has_field(&self, field: &str) -> bool {
        self.iter().any(|(f, _)| f == field)
    }

    fn merge(&mut self, update: &[DataField]) {
        for (name, value) in update {
            match self.iter_mut().find(|(f, _)| f == name) {
                Some(existing) => existing.1 = value.clone(),
                None => self.push((name.clone(), value.clone())),
            }
        }
    }
}

/// Builds a [`Fields`] collection from name/value pairs.
#[macro_export]
macro_rules! fields {
    ($($field:expr => $value:expr),* $(,)?) => {
        vec![
            $(($field.to_string(), $crate::FieldValue::from($value)),)*
        ]
    };
}

/// Key of a table entry: ordered (name, value) key tuples.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableKey(Vec<(String, u64)>);

impl TableKey {
    pub fn new(parts: Vec<(String, u64)>) -> Self {
        Self(parts)
    }

    /// Key made of a single tuple.
    pub fn single(name: &str, value: u64) -> Self {
        Self(vec![(name.to_string(), value)])
    }

    /// Appends another key tuple.
    pub fn with(mut self, name: &str, value: u64) -> Self {
        self.0.push((name.to_string(), value));
        self
    }

    /// Looks up a key tuple by name.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        Ok(())
    }
}

/// Where a read is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Live values from the device, including counters.
    Hardware,
    /// Programmed values from the driver's software shadow.
    Cache,
}

/// Access to the device's named tables.
///
/// Calls are blocking and atomic: each either fully applies or fails.
/// Implementations must be shareable between threads.
pub trait TableGateway: Send + Sync {
    /// Reads one entry.
    fn get(
        &self,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        mode: ReadMode,
    ) -> TableResult<Fields>;

    /// Adds an entry. Fails with `DuplicateKey` if the key already exists.
    fn add_entry(
        &self,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        fields: &Fields,
    ) -> TableResult<()>;

    /// Modifies the named fields of an existing entry. Fails with `NotFound`
    /// if the key is absent.
    fn modify_entry(
        &self,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        fields: &Fields,
    ) -> TableResult<()>;
}
