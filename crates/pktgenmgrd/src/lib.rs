//! # pktgenmgrd - Packet Generator Application Manager
//!
//! Programs the packet generator of a switch ASIC through its table
//! interface and tracks the lifecycle of each generator application.
//!
//! ## Responsibilities
//! - Validated per-application generator configuration
//! - Generator port enablement with read-back verification
//! - Create-or-modify of application entries
//! - Payload buffer programming
//! - Start/stop of applications and counter retrieval
//!
//! ## Tables
//! - `port_cfg`: per-port generator enable flag
//! - `app_cfg`: per-application timing, trigger and live counters
//! - `pkt_buffer`: template payload bytes, keyed by (offset, size)
//!
//! ## Lifecycle
//! `Unregistered -> Configured -> Running <-> Stopped`. Configured and
//! Stopped both mean `app_enable=false` on the device; there is no teardown.

pub mod command;
pub mod config_file;
mod error;
pub mod frames;
mod pktgen_mgr;
mod tables;
mod trigger;
mod types;

pub use error::{PktgenError, PktgenResult};
pub use pktgen_mgr::{GeneratorManager, GeneratorManagerConfig};
pub use tables::*;
pub use trigger::TriggerKind;
pub use types::*;
