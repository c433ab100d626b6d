//! Verification helpers for testing the generator manager
//!
//! `RecordingGateway` sits between the manager and the device model, logs
//! every table call and can inject device faults. `TableVerifier` asserts on
//! the resulting table state.

use std::sync::Arc;

use parking_lot::Mutex;
use pktgen_table::schema::{port_cfg, APP_CFG_TABLE, PORT_CFG_TABLE};
use pktgen_table::{
    FieldValue, Fields, FieldsExt, ReadMode, SimulatedDevice, TableError, TableGateway, TableKey,
    TableResult,
};
use thiserror::Error;
use tracing::trace;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected entry {table}:{key} not found")]
    EntryNotFound { table: String, key: String },

    #[error("Expected field '{field}' not found in {table}:{key}")]
    FieldNotFound {
        table: String,
        key: String,
        field: String,
    },

    #[error("Value mismatch for {table}:{key} {field}: expected '{expected}', got '{actual}'")]
    ValueMismatch {
        table: String,
        key: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Expected {expected} entries in {table}, found {actual}")]
    EntryCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("Expected {expected} {op:?} calls on {table}, recorded {actual}")]
    CallCountMismatch {
        table: String,
        op: TableOp,
        expected: usize,
        actual: usize,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Kind of table call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableOp {
    Get(ReadMode),
    Add,
    Modify,
}

/// One call observed by the recording gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct TableCall {
    pub op: TableOp,
    pub table: String,
    pub key: TableKey,
    pub data_type: Option<String>,
    /// Fields written; empty for reads.
    pub fields: Fields,
}

/// Device misbehaviour to inject.
#[derive(Debug, Clone)]
pub enum Fault {
    /// Cache reads of application entries report `value` for `field`.
    CorruptAppField { field: String, value: FieldValue },
    /// Port enables are acknowledged but never take effect.
    DropPortEnable,
    /// Every call on `table` fails with a transport error.
    Unreachable { table: String },
}

/// Gateway that records calls and forwards them to a device model.
pub struct RecordingGateway {
    device: Arc<SimulatedDevice>,
    calls: Mutex<Vec<TableCall>>,
    faults: Mutex<Vec<Fault>>,
}

impl RecordingGateway {
    pub fn new(device: Arc<SimulatedDevice>) -> Self {
        Self {
            device,
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
        }
    }

    pub fn inject(&self, fault: Fault) {
        self.faults.lock().push(fault);
    }

    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<TableCall> {
        self.calls.lock().clone()
    }

    /// Calls of kind `op` on `table`.
    pub fn calls_to(&self, table: &str, op: TableOp) -> Vec<TableCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.table == table && c.op == op)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Verify the number of `op` calls on `table`
    pub fn assert_call_count(&self, table: &str, op: TableOp, expected: usize) -> VerifyResult<()> {
        let actual = self.calls_to(table, op).len();
        if actual != expected {
            return Err(VerificationError::CallCountMismatch {
                table: table.to_string(),
                op,
                expected,
                actual,
            });
        }
        Ok(())
    }

    fn record(
        &self,
        op: TableOp,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        fields: &Fields,
    ) -> TableResult<()> {
        trace!("{:?} {}:{} {:?}", op, table, key, data_type);
        self.calls.lock().push(TableCall {
            op,
            table: table.to_string(),
            key: key.clone(),
            data_type: data_type.map(str::to_string),
            fields: fields.clone(),
        });

        let unreachable = self
            .faults
            .lock()
            .iter()
            .any(|f| matches!(f, Fault::Unreachable { table: t } if t == table));
        if unreachable {
            return Err(TableError::transport(
                format!("{:?} {}", op, table),
                "device unreachable",
            ));
        }
        Ok(())
    }
}

impl TableGateway for RecordingGateway {
    fn get(
        &self,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        mode: ReadMode,
    ) -> TableResult<Fields> {
        self.record(TableOp::Get(mode), table, key, data_type, &Vec::new())?;
        let mut fields = self.device.get(table, key, data_type, mode)?;

        if table == APP_CFG_TABLE && mode == ReadMode::Cache {
            for fault in self.faults.lock().iter() {
                if let Fault::CorruptAppField { field, value } = fault {
                    fields.merge(&[(field.clone(), value.clone())]);
                }
            }
        }
        Ok(fields)
    }

    fn add_entry(
        &self,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        fields: &Fields,
    ) -> TableResult<()> {
        self.record(TableOp::Add, table, key, data_type, fields)?;

        let drop_enable = table == PORT_CFG_TABLE
            && fields.get_bool(port_cfg::PKTGEN_ENABLE) == Some(true)
            && self
                .faults
                .lock()
                .iter()
                .any(|f| matches!(f, Fault::DropPortEnable));
        if drop_enable {
            return Ok(());
        }
        self.device.add_entry(table, key, data_type, fields)
    }

    fn modify_entry(
        &self,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        fields: &Fields,
    ) -> TableResult<()> {
        self.record(TableOp::Modify, table, key, data_type, fields)?;
        self.device.modify_entry(table, key, data_type, fields)
    }
}

/// Table state verification helper
pub struct TableVerifier<'a> {
    device: &'a SimulatedDevice,
}

impl<'a> TableVerifier<'a> {
    pub fn new(device: &'a SimulatedDevice) -> Self {
        Self { device }
    }

    fn entry(&self, table: &str, key: &TableKey) -> VerifyResult<(Option<String>, Fields)> {
        self.device
            .snapshot(table, key)
            .ok_or_else(|| VerificationError::EntryNotFound {
                table: table.to_string(),
                key: key.to_string(),
            })
    }

    /// Verify that an entry exists
    pub fn assert_entry_exists(&self, table: &str, key: &TableKey) -> VerifyResult<()> {
        self.entry(table, key).map(|_| ())
    }

    /// Verify that a programmed field has a specific value
    pub fn assert_field_value(
        &self,
        table: &str,
        key: &TableKey,
        field: &str,
        expected: impl Into<FieldValue>,
    ) -> VerifyResult<()> {
        let expected = expected.into();
        let (_, fields) = self.entry(table, key)?;
        match fields.get_field(field) {
            None => Err(VerificationError::FieldNotFound {
                table: table.to_string(),
                key: key.to_string(),
                field: field.to_string(),
            }),
            Some(actual) if *actual == expected => Ok(()),
            Some(actual) => Err(VerificationError::ValueMismatch {
                table: table.to_string(),
                key: key.to_string(),
                field: field.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            }),
        }
    }

    /// Verify the data type an entry was last written with
    pub fn assert_data_type(&self, table: &str, key: &TableKey, expected: &str) -> VerifyResult<()> {
        let (data_type, _) = self.entry(table, key)?;
        if data_type.as_deref() != Some(expected) {
            return Err(VerificationError::ValueMismatch {
                table: table.to_string(),
                key: key.to_string(),
                field: "data_type".to_string(),
                expected: expected.to_string(),
                actual: data_type.unwrap_or_default(),
            });
        }
        Ok(())
    }

    /// Verify the number of entries in a table
    pub fn assert_entry_count(&self, table: &str, expected: usize) -> VerifyResult<()> {
        let actual = self.device.entry_count(table);
        if actual != expected {
            return Err(VerificationError::EntryCountMismatch {
                table: table.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Programmed bytes of a buffer entry
    pub fn buffer_bytes(&self, key: &TableKey) -> VerifyResult<Vec<u8>> {
        let (_, fields) = self.entry(pktgen_table::schema::PKT_BUFFER_TABLE, key)?;
        fields
            .get_field(pktgen_table::schema::pkt_buffer::BUFFER)
            .and_then(FieldValue::as_bytes)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| VerificationError::FieldNotFound {
                table: pktgen_table::schema::PKT_BUFFER_TABLE.to_string(),
                key: key.to_string(),
                field: pktgen_table::schema::pkt_buffer::BUFFER.to_string(),
            })
    }
}
