//! Table and field names of the device's packet generator tables.

/// Port configuration table, keyed by device port.
pub const PORT_CFG_TABLE: &str = "port_cfg";

/// Application configuration table, keyed by application id.
pub const APP_CFG_TABLE: &str = "app_cfg";

/// Packet buffer table, keyed by (offset, size).
pub const PKT_BUFFER_TABLE: &str = "pkt_buffer";

/// Every table the generator uses.
pub const ALL_TABLES: &[&str] = &[PORT_CFG_TABLE, APP_CFG_TABLE, PKT_BUFFER_TABLE];

pub mod port_cfg {
    pub const DEV_PORT: &str = "dev_port";
    pub const PKTGEN_ENABLE: &str = "pktgen_enable";
}

pub mod app_cfg {
    pub const APP_ID: &str = "app_id";

    pub const TIMER_NANOSEC: &str = "timer_nanosec";
    pub const APP_ENABLE: &str = "app_enable";
    pub const PKT_LEN: &str = "pkt_len";
    pub const PKT_BUFFER_OFFSET: &str = "pkt_buffer_offset";
    pub const PIPE_LOCAL_SOURCE_PORT: &str = "pipe_local_source_port";
    pub const INCREMENT_SOURCE_PORT: &str = "increment_source_port";
    pub const BATCH_COUNT_CFG: &str = "batch_count_cfg";
    pub const PACKETS_PER_BATCH_CFG: &str = "packets_per_batch_cfg";
    pub const IBG: &str = "ibg";
    pub const IBG_JITTER: &str = "ibg_jitter";
    pub const IPG: &str = "ipg";
    pub const IPG_JITTER: &str = "ipg_jitter";

    pub const BATCH_COUNTER: &str = "batch_counter";
    pub const PKT_COUNTER: &str = "pkt_counter";
    pub const TRIGGER_COUNTER: &str = "trigger_counter";

    /// Live counters maintained by the device.
    pub const COUNTERS: &[&str] = &[BATCH_COUNTER, PKT_COUNTER, TRIGGER_COUNTER];
}

pub mod pkt_buffer {
    pub const PKT_BUFFER_OFFSET: &str = "pkt_buffer_offset";
    pub const PKT_BUFFER_SIZE: &str = "pkt_buffer_size";
    pub const BUFFER: &str = "buffer";
}

/// Data type selectors of the application table, one per trigger.
pub mod trigger {
    pub const TIMER_ONE_SHOT: &str = "trigger_timer_one_shot";
    pub const TIMER_PERIODIC: &str = "trigger_timer_periodic";
    pub const PORT_DOWN: &str = "trigger_port_down";
    pub const RECIRC_PATTERN: &str = "trigger_recirc_pattern";
    pub const DPRSR: &str = "trigger_dprsr";
    pub const PFC: &str = "trigger_pfc";
}
