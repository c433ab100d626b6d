//! GeneratorManager - lifecycle of packet generator applications

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, instrument, warn};

use pktgen_table::schema::{app_cfg, pkt_buffer, port_cfg};
use pktgen_table::{
    fields, FieldValue, Fields, FieldsExt, ReadMode, TableError, TableGateway, TableKey,
};
use pktgen_types::{DevPort, PortRange};

use crate::error::{PktgenError, PktgenResult};
use crate::frames::buffer_payload;
use crate::tables::{APP_CFG_TABLE, PKT_BUFFER_TABLE, PORT_CFG_TABLE};
use crate::trigger::TriggerKind;
use crate::types::{AppId, AppState, ApplicationRecord, Counters, GeneratorConfig};

/// Application fields read back after programming when verification is on.
const VERIFIED_APP_FIELDS: &[&str] = &[
    app_cfg::TIMER_NANOSEC,
    app_cfg::PKT_LEN,
    app_cfg::PKT_BUFFER_OFFSET,
    app_cfg::INCREMENT_SOURCE_PORT,
    app_cfg::IBG,
    app_cfg::IBG_JITTER,
    app_cfg::IPG,
    app_cfg::IPG_JITTER,
];

/// Device parameters of a manager.
#[derive(Debug, Clone)]
pub struct GeneratorManagerConfig {
    /// Ports able to host a generator on this ASIC.
    pub generator_ports: PortRange,
    /// Read application entries back after writing them.
    pub verify_writes: bool,
}

impl Default for GeneratorManagerConfig {
    fn default() -> Self {
        Self {
            generator_ports: PortRange::TOFINO,
            verify_writes: true,
        }
    }
}

/// GeneratorManager programs generator applications and tracks their state.
///
/// Programming flow for `set_app`:
/// 1. `port_cfg`: enable the generator on the source port
/// 2. `app_cfg`: add (first time) or modify the application entry
/// 3. `pkt_buffer`: write the template payload at the configured offset
///
/// The registry is the authority on whether an application entry exists;
/// the device disagreeing is a hardware mismatch. One lock covers each
/// operation end to end, so concurrent callers see whole transitions.
pub struct GeneratorManager {
    gateway: Arc<dyn TableGateway>,
    config: GeneratorManagerConfig,
    apps: Mutex<HashMap<AppId, ApplicationRecord>>,
}

fn app_key(app_id: AppId) -> TableKey {
    TableKey::single(app_cfg::APP_ID, u64::from(app_id))
}

fn port_key(port: DevPort) -> TableKey {
    TableKey::single(port_cfg::DEV_PORT, u64::from(port))
}

fn render(value: Option<&FieldValue>) -> String {
    value.map_or_else(|| "<missing>".to_string(), ToString::to_string)
}

impl GeneratorManager {
    pub fn new(gateway: Arc<dyn TableGateway>, config: GeneratorManagerConfig) -> Self {
        Self {
            gateway,
            config,
            apps: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GeneratorManagerConfig {
        &self.config
    }

    /// Reads the generator enable flag of a port. A port without an entry
    /// is disabled.
    pub fn port_enabled(&self, port: DevPort) -> PktgenResult<bool> {
        match self
            .gateway
            .get(PORT_CFG_TABLE, &port_key(port), None, ReadMode::Cache)
        {
            Ok(fields) => Ok(fields.get_bool(port_cfg::PKTGEN_ENABLE).unwrap_or(false)),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Enables packet generation on a port. No-op if already enabled.
    #[instrument(skip(self))]
    pub fn enable_port(&self, port: DevPort) -> PktgenResult<()> {
        let range = self.config.generator_ports;
        if !range.contains(port) {
            return Err(PktgenError::PortOutOfRange { port, range });
        }

        if self.port_enabled(port)? {
            debug!("Generator already enabled on port {}", port);
            return Ok(());
        }

        let key = port_key(port);
        self.gateway.add_entry(
            PORT_CFG_TABLE,
            &key,
            None,
            &fields! { port_cfg::PKTGEN_ENABLE => true },
        )?;

        if !self.port_enabled(port)? {
            error!("Port {} still reports the generator disabled after enabling", port);
            return Err(PktgenError::hardware_mismatch(
                PORT_CFG_TABLE,
                key,
                port_cfg::PKTGEN_ENABLE,
                true,
                false,
            ));
        }

        info!("Enabled generator on port {}", port);
        Ok(())
    }

    /// Registers or reconfigures an application.
    ///
    /// Reconfiguring rewrites the whole entry, including `app_enable=false`,
    /// so a running application is left stopped. Once the entry write
    /// succeeds the application is registered even if verification or the
    /// buffer write fails afterwards; calling `set_app` again completes it.
    #[instrument(skip(self, config))]
    pub fn set_app(
        &self,
        app_id: AppId,
        port: DevPort,
        config: &GeneratorConfig,
        trigger: TriggerKind,
    ) -> PktgenResult<()> {
        let mut apps = self.apps.lock();

        // build the payload before touching the device so a bad length
        // leaves no partial programming behind
        let payload = buffer_payload(config)?;

        self.enable_port(port)?;

        let key = app_key(app_id);
        let fields = config.to_table_fields(port);
        let previous = apps.get(&app_id).cloned();

        match &previous {
            None => self
                .gateway
                .add_entry(APP_CFG_TABLE, &key, Some(trigger.identifier()), &fields)
                .map_err(|e| self.registry_mismatch(e, &key, "absent", "present"))?,
            Some(_) => self
                .gateway
                .modify_entry(APP_CFG_TABLE, &key, Some(trigger.identifier()), &fields)
                .map_err(|e| self.registry_mismatch(e, &key, "present", "absent"))?,
        }

        // the entry now exists on the device; a retry after a later failure
        // must modify it
        let mut record = ApplicationRecord::new(port, trigger);
        if let Some(prev) = previous {
            if prev.started {
                info!("Application {} was running; reconfiguration leaves it stopped", app_id);
            }
            record.has_run = prev.has_run;
        }
        apps.insert(app_id, record);

        if self.config.verify_writes {
            self.verify_app_entry(&key, trigger, &fields)?;
        }

        self.program_buffer(config, payload)?;

        info!(
            "Application {} configured on port {} with trigger {}",
            app_id, port, trigger
        );
        Ok(())
    }

    /// Maps an add/modify rejection that contradicts the registry to a
    /// hardware mismatch; other gateway errors pass through.
    fn registry_mismatch(
        &self,
        err: TableError,
        key: &TableKey,
        expected: &str,
        actual: &str,
    ) -> PktgenError {
        if err.is_duplicate_key() || err.is_not_found() {
            error!("Application entry {} is {} on the device but {} in the registry", key, actual, expected);
            PktgenError::hardware_mismatch(APP_CFG_TABLE, key, "entry", expected, actual)
        } else {
            err.into()
        }
    }

    fn verify_app_entry(
        &self,
        key: &TableKey,
        trigger: TriggerKind,
        written: &Fields,
    ) -> PktgenResult<()> {
        let programmed =
            self.gateway
                .get(APP_CFG_TABLE, key, Some(trigger.identifier()), ReadMode::Cache)?;

        for field in VERIFIED_APP_FIELDS {
            let expected = written.get_field(field);
            let actual = programmed.get_field(field);
            if expected != actual {
                error!("Application entry {} field {} was not programmed as written", key, field);
                return Err(PktgenError::hardware_mismatch(
                    APP_CFG_TABLE,
                    key,
                    *field,
                    render(expected),
                    render(actual),
                ));
            }
        }
        Ok(())
    }

    /// Writes the payload at the configured offset, replacing an existing
    /// buffer entry with the same offset and size.
    fn program_buffer(&self, config: &GeneratorConfig, payload: Vec<u8>) -> PktgenResult<()> {
        let key = TableKey::single(pkt_buffer::PKT_BUFFER_OFFSET, config.packet_buffer_offset())
            .with(pkt_buffer::PKT_BUFFER_SIZE, config.buffer_size());
        let data = fields! { pkt_buffer::BUFFER => payload };

        match self.gateway.add_entry(PKT_BUFFER_TABLE, &key, None, &data) {
            Err(e) if e.is_duplicate_key() => {
                debug!("Buffer entry {} exists, rewriting", key);
                self.gateway.modify_entry(PKT_BUFFER_TABLE, &key, None, &data)?;
            }
            result => result?,
        }
        debug!("Programmed packet buffer {}", key);
        Ok(())
    }

    fn set_enable(&self, app_id: AppId, enable: bool) -> PktgenResult<()> {
        let mut apps = self.apps.lock();
        let record = apps
            .get_mut(&app_id)
            .ok_or(PktgenError::NotRegistered(app_id))?;

        if record.started == enable {
            let err = if enable {
                PktgenError::AlreadyRunning(app_id)
            } else {
                PktgenError::NotRunning(app_id)
            };
            warn!("{}", err);
            return Err(err);
        }

        self.gateway.modify_entry(
            APP_CFG_TABLE,
            &app_key(app_id),
            Some(record.trigger.identifier()),
            &fields! { app_cfg::APP_ENABLE => enable },
        )?;

        record.started = enable;
        record.has_run |= enable;
        Ok(())
    }

    /// Starts generation for a registered application.
    #[instrument(skip(self))]
    pub fn start(&self, app_id: AppId) -> PktgenResult<()> {
        self.set_enable(app_id, true)?;
        info!("Started application {}", app_id);
        Ok(())
    }

    /// Stops generation for a running application.
    #[instrument(skip(self))]
    pub fn stop(&self, app_id: AppId) -> PktgenResult<()> {
        self.set_enable(app_id, false)?;
        info!("Stopped application {}", app_id);
        Ok(())
    }

    /// Reads the live counters of an application from the device.
    #[instrument(skip(self))]
    pub fn get_report(&self, app_id: AppId) -> PktgenResult<Counters> {
        let trigger = self
            .apps
            .lock()
            .get(&app_id)
            .map(|r| r.trigger)
            .ok_or(PktgenError::NotRegistered(app_id))?;

        let fields = self.gateway.get(
            APP_CFG_TABLE,
            &app_key(app_id),
            Some(trigger.identifier()),
            ReadMode::Hardware,
        )?;

        let counter = |name: &str| {
            fields.get_int(name).ok_or_else(|| {
                PktgenError::from(TableError::invalid_field(
                    APP_CFG_TABLE,
                    name,
                    "counter missing from response",
                ))
            })
        };

        Ok(Counters {
            batch_counter: counter(app_cfg::BATCH_COUNTER)?,
            pkt_counter: counter(app_cfg::PKT_COUNTER)?,
            trigger_counter: counter(app_cfg::TRIGGER_COUNTER)?,
        })
    }

    /// Alias of [`get_report`](Self::get_report).
    pub fn get_counters(&self, app_id: AppId) -> PktgenResult<Counters> {
        self.get_report(app_id)
    }

    /// Source port an application was registered on.
    pub fn get_app_port(&self, app_id: AppId) -> PktgenResult<DevPort> {
        self.apps
            .lock()
            .get(&app_id)
            .map(|r| r.source_port)
            .ok_or(PktgenError::NotRegistered(app_id))
    }

    pub fn app_record(&self, app_id: AppId) -> Option<ApplicationRecord> {
        self.apps.lock().get(&app_id).cloned()
    }

    pub fn app_state(&self, app_id: AppId) -> AppState {
        self.apps
            .lock()
            .get(&app_id)
            .map_or(AppState::Unregistered, ApplicationRecord::state)
    }

    /// Registered application ids, ascending.
    pub fn app_ids(&self) -> Vec<AppId> {
        let mut ids: Vec<AppId> = self.apps.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_running(&self, app_id: AppId) -> bool {
        self.app_state(app_id) == AppState::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pktgen_table::SimulatedDevice;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn manager() -> (Arc<SimulatedDevice>, GeneratorManager) {
        let device = Arc::new(SimulatedDevice::with_manual_clock());
        let mgr = GeneratorManager::new(device.clone(), GeneratorManagerConfig::default());
        (device, mgr)
    }

    #[test]
    fn test_enable_port_out_of_range() {
        let (device, mgr) = manager();
        let err = mgr.enable_port(72).unwrap_err();
        assert!(matches!(err, PktgenError::PortOutOfRange { port: 72, .. }));
        assert_eq!(device.entry_count(PORT_CFG_TABLE), 0);
    }

    #[test]
    fn test_enable_port_is_idempotent() {
        let (device, mgr) = manager();
        assert!(!mgr.port_enabled(68).unwrap());
        mgr.enable_port(68).unwrap();
        mgr.enable_port(68).unwrap();
        assert!(mgr.port_enabled(68).unwrap());
        assert_eq!(device.entry_count(PORT_CFG_TABLE), 1);
    }

    #[test]
    fn test_injected_port_range() {
        let device = Arc::new(SimulatedDevice::with_manual_clock());
        let mgr = GeneratorManager::new(
            device,
            GeneratorManagerConfig {
                generator_ports: PortRange::TOFINO2,
                verify_writes: false,
            },
        );
        assert!(mgr.enable_port(6).is_ok());
        assert!(mgr.enable_port(68).is_err());
    }

    #[test]
    fn test_set_app_programs_all_tables() {
        let (device, mgr) = manager();
        let cfg = GeneratorConfig::new();
        mgr.set_app(1, 68, &cfg, TriggerKind::OneShot).unwrap();

        let (data_type, fields) = device.snapshot(APP_CFG_TABLE, &app_key(1)).unwrap();
        assert_eq!(data_type.as_deref(), Some("trigger_timer_one_shot"));
        assert_eq!(fields, cfg.to_table_fields(68));

        let buffer_key = TableKey::single(pkt_buffer::PKT_BUFFER_OFFSET, 144)
            .with(pkt_buffer::PKT_BUFFER_SIZE, 94);
        let (_, buffer) = device.snapshot(PKT_BUFFER_TABLE, &buffer_key).unwrap();
        let bytes = buffer
            .get_field(pkt_buffer::BUFFER)
            .and_then(FieldValue::as_bytes)
            .unwrap();
        assert_eq!(bytes.len(), 94);

        assert_eq!(mgr.get_app_port(1).unwrap(), 68);
        assert_eq!(mgr.app_state(1), AppState::Configured);
    }

    #[test]
    fn test_set_app_twice_modifies() {
        let (device, mgr) = manager();
        let mut cfg = GeneratorConfig::new();
        mgr.set_app(1, 68, &cfg, TriggerKind::OneShot).unwrap();

        cfg.set_timer_nanosec(500);
        mgr.set_app(1, 69, &cfg, TriggerKind::Periodic).unwrap();

        assert_eq!(device.entry_count(APP_CFG_TABLE), 1);
        let (data_type, fields) = device.snapshot(APP_CFG_TABLE, &app_key(1)).unwrap();
        assert_eq!(data_type.as_deref(), Some("trigger_timer_periodic"));
        assert_eq!(fields.get_int(app_cfg::TIMER_NANOSEC), Some(500));
        assert_eq!(mgr.get_app_port(1).unwrap(), 69);
        assert_eq!(mgr.app_record(1).unwrap().trigger, TriggerKind::Periodic);
        // same offset and size: the buffer entry is rewritten in place
        assert_eq!(device.entry_count(PKT_BUFFER_TABLE), 1);
    }

    #[test]
    fn test_set_app_detects_foreign_entry() {
        let (device, mgr) = manager();
        device
            .add_entry(APP_CFG_TABLE, &app_key(3), None, &fields! { app_cfg::APP_ENABLE => false })
            .unwrap();

        let err = mgr
            .set_app(3, 68, &GeneratorConfig::new(), TriggerKind::OneShot)
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(mgr.app_state(3), AppState::Unregistered);
    }

    #[test]
    fn test_set_app_invalid_length_writes_nothing() {
        let (device, mgr) = manager();
        let mut cfg = GeneratorConfig::new();
        cfg.set_packet_length_bytes(10).unwrap();

        let err = mgr.set_app(1, 68, &cfg, TriggerKind::OneShot).unwrap_err();
        assert!(matches!(err, PktgenError::InvalidConfig { .. }));
        assert_eq!(device.entry_count(PORT_CFG_TABLE), 0);
        assert_eq!(device.entry_count(APP_CFG_TABLE), 0);
    }

    #[test]
    fn test_start_stop_misuse() {
        let (_device, mgr) = manager();
        assert!(matches!(mgr.start(1), Err(PktgenError::NotRegistered(1))));
        assert!(matches!(mgr.stop(1), Err(PktgenError::NotRegistered(1))));

        mgr.set_app(1, 68, &GeneratorConfig::new(), TriggerKind::OneShot)
            .unwrap();
        assert!(matches!(mgr.stop(1), Err(PktgenError::NotRunning(1))));

        mgr.start(1).unwrap();
        let err = mgr.start(1).unwrap_err();
        assert!(err.is_misuse());
        assert!(mgr.is_running(1));

        mgr.stop(1).unwrap();
        assert_eq!(mgr.app_state(1), AppState::Stopped);
        assert!(matches!(mgr.stop(1), Err(PktgenError::NotRunning(1))));
    }

    #[test]
    fn test_start_sets_only_app_enable() {
        let (device, mgr) = manager();
        let cfg = GeneratorConfig::new();
        mgr.set_app(2, 70, &cfg, TriggerKind::Periodic).unwrap();
        mgr.start(2).unwrap();

        let (_, fields) = device.snapshot(APP_CFG_TABLE, &app_key(2)).unwrap();
        assert_eq!(fields.get_bool(app_cfg::APP_ENABLE), Some(true));
        assert_eq!(fields.get_int(app_cfg::TIMER_NANOSEC), Some(cfg.timer_nanosec()));
    }

    #[test]
    fn test_reconfigure_running_app_leaves_it_stopped() {
        let (_device, mgr) = manager();
        let cfg = GeneratorConfig::new();
        mgr.set_app(1, 68, &cfg, TriggerKind::OneShot).unwrap();
        mgr.start(1).unwrap();
        mgr.set_app(1, 68, &cfg, TriggerKind::OneShot).unwrap();

        assert_eq!(mgr.app_state(1), AppState::Stopped);
        mgr.start(1).unwrap();
    }

    #[test]
    fn test_report_counts() {
        let (device, mgr) = manager();
        let mut cfg = GeneratorConfig::new();
        cfg.set_timer_nanosec(1_000);
        cfg.set_packets_per_batch(4).unwrap();
        mgr.set_app(1, 68, &cfg, TriggerKind::Periodic).unwrap();

        assert!(matches!(mgr.get_report(9), Err(PktgenError::NotRegistered(9))));
        assert_eq!(mgr.get_report(1).unwrap(), Counters::default());

        mgr.start(1).unwrap();
        device.advance(Duration::from_nanos(2_500));
        assert_eq!(
            mgr.get_counters(1).unwrap(),
            Counters {
                batch_counter: 2,
                pkt_counter: 8,
                trigger_counter: 2,
            }
        );
    }

    #[test]
    fn test_app_ids_sorted() {
        let (_device, mgr) = manager();
        let cfg = GeneratorConfig::new();
        let mut second = cfg.clone();
        second.set_packet_buffer_offset(1024);
        mgr.set_app(5, 68, &cfg, TriggerKind::OneShot).unwrap();
        mgr.set_app(2, 68, &second, TriggerKind::OneShot).unwrap();
        assert_eq!(mgr.app_ids(), vec![2, 5]);
    }
}
