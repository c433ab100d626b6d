//! Type definitions for pktgenmgrd

use pktgen_table::schema::app_cfg;
use pktgen_table::{fields, Fields};
use pktgen_types::DevPort;
use serde::{Deserialize, Serialize};

use crate::error::{PktgenError, PktgenResult};
use crate::tables::{
    defaults, FRAMING_HEADER_LEN, MAX_BATCH_COUNT, MAX_PACKETS_PER_BATCH, NANOS_PER_SEC,
};
use crate::trigger::TriggerKind;

/// Generator application identifier.
pub type AppId = u32;

/// Validated configuration of one generator application.
///
/// Counts are 1-based here and written 0-based to the device. The packet
/// length includes the framing header the generator prepends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    timer_nanosec: u64,
    packet_length_bytes: u64,
    packet_buffer_offset: u64,
    increment_source_port: bool,
    batch_count: u32,
    packets_per_batch: u32,
    inter_batch_gap_nanosec: u64,
    inter_batch_gap_jitter_nanosec: u64,
    inter_packet_gap_nanosec: u64,
    inter_packet_gap_jitter_nanosec: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            timer_nanosec: defaults::TIMER_NANOSEC,
            packet_length_bytes: defaults::PACKET_LENGTH_BYTES,
            packet_buffer_offset: defaults::PACKET_BUFFER_OFFSET,
            increment_source_port: defaults::INCREMENT_SOURCE_PORT,
            batch_count: defaults::BATCH_COUNT,
            packets_per_batch: defaults::PACKETS_PER_BATCH,
            inter_batch_gap_nanosec: 0,
            inter_batch_gap_jitter_nanosec: 0,
            inter_packet_gap_nanosec: 0,
            inter_packet_gap_jitter_nanosec: 0,
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timer_nanosec(&self) -> u64 {
        self.timer_nanosec
    }

    pub fn packet_length_bytes(&self) -> u64 {
        self.packet_length_bytes
    }

    pub fn packet_buffer_offset(&self) -> u64 {
        self.packet_buffer_offset
    }

    pub fn increment_source_port(&self) -> bool {
        self.increment_source_port
    }

    pub fn batch_count(&self) -> u32 {
        self.batch_count
    }

    pub fn packets_per_batch(&self) -> u32 {
        self.packets_per_batch
    }

    pub fn inter_batch_gap_nanosec(&self) -> u64 {
        self.inter_batch_gap_nanosec
    }

    pub fn inter_batch_gap_jitter_nanosec(&self) -> u64 {
        self.inter_batch_gap_jitter_nanosec
    }

    pub fn inter_packet_gap_nanosec(&self) -> u64 {
        self.inter_packet_gap_nanosec
    }

    pub fn inter_packet_gap_jitter_nanosec(&self) -> u64 {
        self.inter_packet_gap_jitter_nanosec
    }

    /// Size of the payload held in the packet buffer (frame minus framing header).
    pub fn buffer_size(&self) -> u64 {
        self.packet_length_bytes - FRAMING_HEADER_LEN
    }

    pub fn set_timer_nanosec(&mut self, timer_nanosec: u64) {
        self.timer_nanosec = timer_nanosec;
    }

    pub fn set_packet_length_bytes(&mut self, length: u64) -> PktgenResult<()> {
        if length < FRAMING_HEADER_LEN {
            return Err(PktgenError::invalid_config(
                "packet_length_bytes",
                format!("{} is shorter than the {}-byte framing header", length, FRAMING_HEADER_LEN),
            ));
        }
        self.packet_length_bytes = length;
        Ok(())
    }

    /// Offsets of concurrently active applications must not overlap; the
    /// caller owns that layout.
    pub fn set_packet_buffer_offset(&mut self, offset: u64) {
        self.packet_buffer_offset = offset;
    }

    pub fn set_increment_source_port(&mut self, increment: bool) {
        self.increment_source_port = increment;
    }

    pub fn set_batch_count(&mut self, batch_count: u32) -> PktgenResult<()> {
        self.batch_count = check_count("batch_count", batch_count, MAX_BATCH_COUNT)?;
        Ok(())
    }

    pub fn set_packets_per_batch(&mut self, packets_per_batch: u32) -> PktgenResult<()> {
        self.packets_per_batch =
            check_count("packets_per_batch", packets_per_batch, MAX_PACKETS_PER_BATCH)?;
        Ok(())
    }

    pub fn set_inter_batch_gap(&mut self, gap_nanosec: u64, jitter_nanosec: u64) {
        self.inter_batch_gap_nanosec = gap_nanosec;
        self.inter_batch_gap_jitter_nanosec = jitter_nanosec;
    }

    pub fn set_inter_packet_gap(&mut self, gap_nanosec: u64, jitter_nanosec: u64) {
        self.inter_packet_gap_nanosec = gap_nanosec;
        self.inter_packet_gap_jitter_nanosec = jitter_nanosec;
    }

    /// Sets the timer so that the whole run (every batch of every packet)
    /// averages `target_pps` packets per second, truncated to whole nanoseconds.
    pub fn set_timer_for_rate(&mut self, target_pps: u64) -> PktgenResult<()> {
        if target_pps == 0 {
            return Err(PktgenError::invalid_config(
                "target_pps",
                "rate must be positive",
            ));
        }
        let packets = u128::from(self.packets_per_batch) * u128::from(self.batch_count);
        let timer = u128::from(NANOS_PER_SEC) * packets / u128::from(target_pps);
        self.timer_nanosec = u64::try_from(timer).map_err(|_| {
            PktgenError::invalid_config("target_pps", format!("{} yields an unrepresentable timer", target_pps))
        })?;
        Ok(())
    }

    /// Packet rate implied by the current timer, if it is non-zero.
    pub fn rate_pps(&self) -> Option<f64> {
        if self.timer_nanosec == 0 {
            return None;
        }
        let packets = f64::from(self.packets_per_batch) * f64::from(self.batch_count);
        Some(NANOS_PER_SEC as f64 * packets / self.timer_nanosec as f64)
    }

    /// Fire as fast as possible: zero timer and zero gaps.
    pub fn set_max_throughput(&mut self) {
        self.timer_nanosec = 0;
        self.set_inter_batch_gap(0, 0);
        self.set_inter_packet_gap(0, 0);
    }

    /// Application table data for this configuration.
    ///
    /// Counts are written 0-based, the length excludes the framing header,
    /// the application starts disabled and the counters start at zero.
    pub fn to_table_fields(&self, local_port: DevPort) -> Fields {
        fields! {
            app_cfg::TIMER_NANOSEC => self.timer_nanosec,
            app_cfg::APP_ENABLE => false,
            app_cfg::PKT_LEN => self.buffer_size(),
            app_cfg::PKT_BUFFER_OFFSET => self.packet_buffer_offset,
            app_cfg::PIPE_LOCAL_SOURCE_PORT => local_port,
            app_cfg::INCREMENT_SOURCE_PORT => self.increment_source_port,
            app_cfg::BATCH_COUNT_CFG => self.batch_count - 1,
            app_cfg::PACKETS_PER_BATCH_CFG => self.packets_per_batch - 1,
            app_cfg::IBG => self.inter_batch_gap_nanosec,
            app_cfg::IBG_JITTER => self.inter_batch_gap_jitter_nanosec,
            app_cfg::IPG => self.inter_packet_gap_nanosec,
            app_cfg::IPG_JITTER => self.inter_packet_gap_jitter_nanosec,
            app_cfg::BATCH_COUNTER => 0u64,
            app_cfg::PKT_COUNTER => 0u64,
            app_cfg::TRIGGER_COUNTER => 0u64,
        }
    }
}

fn check_count(field: &str, value: u32, max: u32) -> PktgenResult<u32> {
    if value == 0 || value > max {
        return Err(PktgenError::invalid_config(
            field,
            format!("{} is outside 1..={}", value, max),
        ));
    }
    Ok(value)
}

/// Runtime state of a registered application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRecord {
    pub source_port: DevPort,
    pub trigger: TriggerKind,
    /// Whether `app_enable` is currently set on the device.
    pub started: bool,
    /// Whether the application was ever started.
    pub has_run: bool,
}

impl ApplicationRecord {
    pub fn new(source_port: DevPort, trigger: TriggerKind) -> Self {
        Self {
            source_port,
            trigger,
            started: false,
            has_run: false,
        }
    }

    pub fn state(&self) -> AppState {
        match (self.started, self.has_run) {
            (true, _) => AppState::Running,
            (false, true) => AppState::Stopped,
            (false, false) => AppState::Configured,
        }
    }
}

/// Lifecycle state of an application id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Unregistered,
    Configured,
    Running,
    Stopped,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unregistered => "unregistered",
            Self::Configured => "configured",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// Raw generator counters as read from the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub batch_counter: u64,
    pub pkt_counter: u64,
    pub trigger_counter: u64,
}
