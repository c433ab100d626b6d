//! Device constants used when programming generator applications.

pub use pktgen_table::schema::{APP_CFG_TABLE, PKT_BUFFER_TABLE, PORT_CFG_TABLE};

/// Bytes at the head of every generated frame that the generator overwrites
/// with its own header. Lengths written to the device exclude them.
pub const FRAMING_HEADER_LEN: u64 = 6;

/// Largest batch count the 16-bit `batch_count_cfg` field can encode.
pub const MAX_BATCH_COUNT: u32 = 1 << 16;

/// Largest packets-per-batch the 16-bit `packets_per_batch_cfg` field can encode.
pub const MAX_PACKETS_PER_BATCH: u32 = 1 << 16;

pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Default application configuration values
pub mod defaults {
    pub const TIMER_NANOSEC: u64 = 1_000_000_000;
    pub const PACKET_LENGTH_BYTES: u64 = 100;
    pub const PACKET_BUFFER_OFFSET: u64 = 144;
    pub const INCREMENT_SOURCE_PORT: bool = true;
    pub const BATCH_COUNT: u32 = 1;
    pub const PACKETS_PER_BATCH: u32 = 1;
}
