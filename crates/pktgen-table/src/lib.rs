//! Table access for the switch packet generator.
//!
//! The generator is programmed entirely through three device tables
//! (port configuration, application configuration, packet buffer). This
//! crate provides:
//!
//! - [`TableGateway`]: the transport-independent table interface the
//!   generator manager drives
//! - [`schema`]: table and field names understood by the device
//! - [`SimulatedDevice`]: an in-process model of those tables, used by tests
//!   and by offline runs of the control tool
//! - [`error`]: error types for table operations
//!
//! # Example
//!
//! ```ignore
//! use pktgen_table::{fields, schema, ReadMode, TableGateway, TableKey};
//!
//! fn enable(gw: &dyn TableGateway, port: u64) -> pktgen_table::TableResult<()> {
//!     let key = TableKey::single(schema::port_cfg::DEV_PORT, port);
//!     gw.add_entry(schema::PORT_CFG_TABLE, &key, None, &fields! {
//!         schema::port_cfg::PKTGEN_ENABLE => true,
//!     })
//! }
//! ```

pub mod error;
pub mod gateway;
pub mod schema;
pub mod sim;

pub use error::{TableError, TableResult};
pub use gateway::{DataField, FieldValue, Fields, FieldsExt, ReadMode, TableGateway, TableKey};
pub use sim::{SimClock, SimulatedDevice};
