//! Test fixtures for common generator scenarios

use std::sync::Arc;

use pktgen_table::SimulatedDevice;
use pktgen_types::{DevPort, PortRange};
use pktgenmgrd::{
    AppId, GeneratorConfig, GeneratorManager, GeneratorManagerConfig, PktgenResult, TriggerKind,
};

use crate::verification::RecordingGateway;

/// One application to program: id, port, trigger and configuration.
#[derive(Debug, Clone)]
pub struct AppScenario {
    pub app_id: AppId,
    pub port: DevPort,
    pub trigger: TriggerKind,
    pub config: GeneratorConfig,
}

impl AppScenario {
    pub fn new(app_id: AppId, port: DevPort, trigger: TriggerKind) -> Self {
        Self {
            app_id,
            port,
            trigger,
            config: GeneratorConfig::new(),
        }
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Programs the scenario through `mgr`.
    pub fn apply(&self, mgr: &GeneratorManager) -> PktgenResult<()> {
        mgr.set_app(self.app_id, self.port, &self.config, self.trigger)
    }
}

/// Generator configuration fixtures
pub mod app_fixtures {
    use super::*;

    /// App 1 on port 68, ONE_SHOT after 1 s, one batch of one 100-byte
    /// packet stored at buffer offset 144.
    pub fn one_shot_default() -> AppScenario {
        AppScenario::new(1, 68, TriggerKind::OneShot)
    }

    /// Periodic app firing every `timer_nanosec` with the given batch shape.
    pub fn periodic(
        app_id: AppId,
        port: DevPort,
        timer_nanosec: u64,
        batch_count: u32,
        packets_per_batch: u32,
    ) -> PktgenResult<AppScenario> {
        let mut config = GeneratorConfig::new();
        config.set_timer_nanosec(timer_nanosec);
        config.set_batch_count(batch_count)?;
        config.set_packets_per_batch(packets_per_batch)?;
        Ok(AppScenario::new(app_id, port, TriggerKind::Periodic).with_config(config))
    }

    /// Event-triggered app (never fires in the device model).
    pub fn port_down(app_id: AppId, port: DevPort) -> AppScenario {
        AppScenario::new(app_id, port, TriggerKind::PortDown)
    }
}

/// A manager wired to a recording gateway over a manually clocked device.
pub struct TestBench {
    pub device: Arc<SimulatedDevice>,
    pub gateway: Arc<RecordingGateway>,
    pub manager: GeneratorManager,
}

impl TestBench {
    /// Tofino port range with write verification on.
    pub fn new() -> Self {
        Self::with_config(GeneratorManagerConfig::default())
    }

    pub fn with_ports(range: PortRange) -> Self {
        Self::with_config(GeneratorManagerConfig {
            generator_ports: range,
            verify_writes: true,
        })
    }

    pub fn with_config(config: GeneratorManagerConfig) -> Self {
        let device = Arc::new(SimulatedDevice::with_manual_clock());
        let gateway = Arc::new(RecordingGateway::new(device.clone()));
        let manager = GeneratorManager::new(gateway.clone(), config);
        Self {
            device,
            gateway,
            manager,
        }
    }
}

impl Default for TestBench {
    fn default() -> Self {
        Self::new()
    }
}
