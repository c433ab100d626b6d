//! Configuration file support for pktgenctl
//!
//! Loads and validates the device and application settings from TOML.
//! Default location: /etc/pktgen/pktgenctl.toml

use std::fs;
use std::path::Path;

use pktgen_types::{port_to_pipe, DevPort, PortRange};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{PktgenError, PktgenResult};
use crate::tables::defaults;
use crate::trigger::TriggerKind;
use crate::types::{AppId, GeneratorConfig};
use crate::GeneratorManagerConfig;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/pktgen/pktgenctl.toml";

const MAX_PIPE_ID: u8 = 3;

/// Switch-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Lowest port able to host a generator
    #[serde(default = "default_generator_port_min")]
    pub generator_port_min: DevPort,

    /// Highest port able to host a generator
    #[serde(default = "default_generator_port_max")]
    pub generator_port_max: DevPort,

    /// Pipe of the generator, used for expected-frame headers. Derived
    /// from the application port when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipe_id: Option<u8>,

    /// Read application entries back after writing them
    #[serde(default = "default_verify_writes")]
    pub verify_writes: bool,
}

/// Generator application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_id")]
    pub app_id: AppId,

    #[serde(default = "default_port")]
    pub port: DevPort,

    /// Trigger name (`one_shot`, `periodic`, ...) or table identifier
    #[serde(default = "default_trigger")]
    pub trigger: String,

    #[serde(default = "default_timer_nanosec")]
    pub timer_nanosec: u64,

    #[serde(default = "default_packet_length_bytes")]
    pub packet_length_bytes: u64,

    #[serde(default = "default_packet_buffer_offset")]
    pub packet_buffer_offset: u64,

    #[serde(default = "default_increment_source_port")]
    pub increment_source_port: bool,

    #[serde(default = "default_batch_count")]
    pub batch_count: u32,

    #[serde(default = "default_packets_per_batch")]
    pub packets_per_batch: u32,

    #[serde(default)]
    pub ibg: u64,

    #[serde(default)]
    pub ibg_jitter: u64,

    #[serde(default)]
    pub ipg: u64,

    #[serde(default)]
    pub ipg_jitter: u64,

    /// Derive the timer from a packet rate instead of `timer_nanosec`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_pps: Option<u64>,

    /// Zero timer and gaps; overrides `target_pps`
    #[serde(default)]
    pub max_throughput: bool,
}

/// Complete pktgenctl configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PktgenctlConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub app: AppConfig,
}

fn default_generator_port_min() -> DevPort {
    PortRange::TOFINO.min
}

fn default_generator_port_max() -> DevPort {
    PortRange::TOFINO.max
}

fn default_verify_writes() -> bool {
    true
}

fn default_app_id() -> AppId {
    1
}

fn default_port() -> DevPort {
    68
}

fn default_trigger() -> String {
    TriggerKind::OneShot.as_str().to_lowercase()
}

fn default_timer_nanosec() -> u64 {
    defaults::TIMER_NANOSEC
}

fn default_packet_length_bytes() -> u64 {
    defaults::PACKET_LENGTH_BYTES
}

fn default_packet_buffer_offset() -> u64 {
    defaults::PACKET_BUFFER_OFFSET
}

fn default_increment_source_port() -> bool {
    defaults::INCREMENT_SOURCE_PORT
}

fn default_batch_count() -> u32 {
    defaults::BATCH_COUNT
}

fn default_packets_per_batch() -> u32 {
    defaults::PACKETS_PER_BATCH
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            generator_port_min: default_generator_port_min(),
            generator_port_max: default_generator_port_max(),
            pipe_id: None,
            verify_writes: default_verify_writes(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            port: default_port(),
            trigger: default_trigger(),
            timer_nanosec: default_timer_nanosec(),
            packet_length_bytes: default_packet_length_bytes(),
            packet_buffer_offset: default_packet_buffer_offset(),
            increment_source_port: default_increment_source_port(),
            batch_count: default_batch_count(),
            packets_per_batch: default_packets_per_batch(),
            ibg: 0,
            ibg_jitter: 0,
            ipg: 0,
            ipg_jitter: 0,
            target_pps: None,
            max_throughput: false,
        }
    }
}

impl DeviceConfig {
    pub fn port_range(&self) -> PktgenResult<PortRange> {
        PortRange::new(self.generator_port_min, self.generator_port_max)
            .map_err(|e| PktgenError::Configuration(e.to_string()))
    }

    pub fn manager_config(&self) -> PktgenResult<GeneratorManagerConfig> {
        Ok(GeneratorManagerConfig {
            generator_ports: self.port_range()?,
            verify_writes: self.verify_writes,
        })
    }
}

impl AppConfig {
    pub fn trigger(&self) -> PktgenResult<TriggerKind> {
        self.trigger.parse()
    }

    /// Builds the validated generator configuration.
    ///
    /// `max_throughput` wins over `target_pps`, which wins over
    /// `timer_nanosec`. The rate is applied after the counts it depends on.
    pub fn generator_config(&self) -> PktgenResult<GeneratorConfig> {
        let mut cfg = GeneratorConfig::new();
        cfg.set_timer_nanosec(self.timer_nanosec);
        cfg.set_packet_length_bytes(self.packet_length_bytes)?;
        cfg.set_packet_buffer_offset(self.packet_buffer_offset);
        cfg.set_increment_source_port(self.increment_source_port);
        cfg.set_batch_count(self.batch_count)?;
        cfg.set_packets_per_batch(self.packets_per_batch)?;
        cfg.set_inter_batch_gap(self.ibg, self.ibg_jitter);
        cfg.set_inter_packet_gap(self.ipg, self.ipg_jitter);

        if self.max_throughput {
            cfg.set_max_throughput();
        } else if let Some(pps) = self.target_pps {
            cfg.set_timer_for_rate(pps)?;
        }
        Ok(cfg)
    }
}

impl PktgenctlConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> PktgenResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                PktgenError::Configuration(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(PktgenError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> PktgenResult<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> PktgenResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            PktgenError::Configuration(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Pipe hosting the application's generator: the configured `pipe_id`,
    /// else the pipe of the application port.
    pub fn pipe_id(&self) -> PktgenResult<u8> {
        let pipe = self
            .device
            .pipe_id
            .map(u32::from)
            .unwrap_or_else(|| port_to_pipe(self.app.port));
        u8::try_from(pipe)
            .ok()
            .filter(|p| *p <= MAX_PIPE_ID)
            .ok_or_else(|| PktgenError::Configuration(format!("pipe_id {} must be 0-{}", pipe, MAX_PIPE_ID)))
    }

    /// Validate configuration
    pub fn validate(&self) -> PktgenResult<()> {
        let range = self.device.port_range()?;

        if !range.contains(self.app.port) {
            return Err(PktgenError::Configuration(format!(
                "app port {} is outside the generator range {}",
                self.app.port, range
            )));
        }

        self.pipe_id()?;

        if self.app.target_pps == Some(0) {
            return Err(PktgenError::Configuration(
                "target_pps must be > 0".to_string(),
            ));
        }

        self.app.trigger()?;
        self.app.generator_config()?;
        Ok(())
    }
}
