//! In-process model of the packet generator tables.
//!
//! `SimulatedDevice` enforces the same add/modify/get contract as the real
//! table service and advances the application counters on hardware reads
//! according to the programmed timer, so the generator manager can be driven
//! end to end without a switch. Only timer triggers fire in the model; port
//! down, recirculation, deparser and PFC triggers depend on dataplane events
//! and leave the counters untouched.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{TableError, TableResult};
use crate::gateway::{Fields, FieldsExt, ReadMode, TableGateway, TableKey};
use crate::schema::{self, app_cfg};

/// Time source of the model.
#[derive(Debug, Clone, Copy)]
pub enum SimClock {
    /// Real elapsed time since the device was created.
    Wall(Instant),
    /// Virtual time, moved only by [`SimulatedDevice::advance`].
    Manual(Duration),
}

impl SimClock {
    fn now(&self) -> Duration {
        match self {
            SimClock::Wall(start) => start.elapsed(),
            SimClock::Manual(now) => *now,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    data_type: Option<String>,
    fields: Fields,
    /// Time the application was last enabled, while it is running.
    running_since: Option<Duration>,
}

#[derive(Debug)]
struct DeviceState {
    clock: SimClock,
    tables: HashMap<String, HashMap<TableKey, Entry>>,
}

/// Table-level model of the generator tables.
#[derive(Debug)]
pub struct SimulatedDevice {
    state: Mutex<DeviceState>,
}

impl SimulatedDevice {
    /// Creates a device model driven by wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(SimClock::Wall(Instant::now()))
    }

    /// Creates a device model whose time only moves through [`advance`](Self::advance).
    pub fn with_manual_clock() -> Self {
        Self::with_clock(SimClock::Manual(Duration::ZERO))
    }

    fn with_clock(clock: SimClock) -> Self {
        let tables = schema::ALL_TABLES
            .iter()
            .map(|name| (name.to_string(), HashMap::new()))
            .collect();
        Self {
            state: Mutex::new(DeviceState { clock, tables }),
        }
    }

    /// Moves virtual time forward. No effect on a wall-clock device.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        if let SimClock::Manual(now) = &mut state.clock {
            *now += by;
        }
    }

    /// Number of entries currently stored in a table.
    pub fn entry_count(&self, table: &str) -> usize {
        self.state.lock().tables.get(table).map_or(0, HashMap::len)
    }

    /// Stored data type and fields of an entry, without counter updates.
    pub fn snapshot(&self, table: &str, key: &TableKey) -> Option<(Option<String>, Fields)> {
        let state = self.state.lock();
        state
            .tables
            .get(table)?
            .get(key)
            .map(|e| (e.data_type.clone(), e.fields.clone()))
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter increments produced by a run of `elapsed` with the given entry.
fn fired_counters(entry: &Entry, elapsed: Duration) -> (u64, u64, u64) {
    let timer = entry.fields.get_int(app_cfg::TIMER_NANOSEC).unwrap_or(0);
    let elapsed_ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);

    let triggers = match entry.data_type.as_deref() {
        Some(schema::trigger::TIMER_ONE_SHOT) => u64::from(elapsed_ns >= timer),
        Some(schema::trigger::TIMER_PERIODIC) => elapsed_ns / timer.max(1),
        _ => 0,
    };

    let batches_per_trigger = entry.fields.get_int(app_cfg::BATCH_COUNT_CFG).unwrap_or(0) + 1;
    let packets_per_batch = entry
        .fields
        .get_int(app_cfg::PACKETS_PER_BATCH_CFG)
        .unwrap_or(0)
        + 1;
    let batches = triggers.saturating_mul(batches_per_trigger);
    let packets = batches.saturating_mul(packets_per_batch);
    (batches, packets, triggers)
}

fn with_counters(entry: &Entry, now: Duration) -> Fields {
    let mut fields = entry.fields.clone();
    let Some(since) = entry.running_since else {
        return fields;
    };
    let (batches, packets, triggers) = fired_counters(entry, now.saturating_sub(since));
    let current = |name: &str| fields.get_int(name).unwrap_or(0);
    let update = crate::fields! {
        app_cfg::BATCH_COUNTER => current(app_cfg::BATCH_COUNTER).saturating_add(batches),
        app_cfg::PKT_COUNTER => current(app_cfg::PKT_COUNTER).saturating_add(packets),
        app_cfg::TRIGGER_COUNTER => current(app_cfg::TRIGGER_COUNTER).saturating_add(triggers),
    };
    fields.merge(&update);
    fields
}

impl DeviceState {
    fn table_mut(&mut self, table: &str) -> TableResult<&mut HashMap<TableKey, Entry>> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| TableError::UnknownTable(table.to_string()))
    }
}

impl TableGateway for SimulatedDevice {
    fn get(
        &self,
        table: &str,
        key: &TableKey,
        _data_type: Option<&str>,
        mode: ReadMode,
    ) -> TableResult<Fields> {
        let mut state = self.state.lock();
        let now = state.clock.now();
        let entry = state
            .table_mut(table)?
            .get(key)
            .ok_or_else(|| TableError::not_found(table, key))?;

        trace!(table, %key, ?mode, "get");
        Ok(match mode {
            ReadMode::Hardware => with_counters(entry, now),
            ReadMode::Cache => entry.fields.clone(),
        })
    }

    fn add_entry(
        &self,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        fields: &Fields,
    ) -> TableResult<()> {
        let mut state = self.state.lock();
        let now = state.clock.now();
        let entries = state.table_mut(table)?;
        if entries.contains_key(key) {
            return Err(TableError::duplicate_key(table, key));
        }

        let running_since = fields
            .get_bool(app_cfg::APP_ENABLE)
            .filter(|enabled| *enabled && table == schema::APP_CFG_TABLE)
            .map(|_| now);
        entries.insert(
            key.clone(),
            Entry {
                data_type: data_type.map(str::to_string),
                fields: fields.clone(),
                running_since,
            },
        );
        debug!(table, %key, fields = fields.len(), "Entry added");
        Ok(())
    }

    fn modify_entry(
        &self,
        table: &str,
        key: &TableKey,
        data_type: Option<&str>,
        fields: &Fields,
    ) -> TableResult<()> {
        let mut state = self.state.lock();
        let now = state.clock.now();
        let entry = state
            .table_mut(table)?
            .get_mut(key)
            .ok_or_else(|| TableError::not_found(table, key))?;

        if table == schema::APP_CFG_TABLE {
            if let Some(enable) = fields.get_bool(app_cfg::APP_ENABLE) {
                match (entry.running_since, enable) {
                    (None, true) => entry.running_since = Some(now),
                    (Some(_), false) => {
                        // fold the run into the stored counters
                        entry.fields = with_counters(entry, now);
                        entry.running_since = None;
                    }
                    _ => {}
                }
            }
        }

        if let Some(data_type) = data_type {
            entry.data_type = Some(data_type.to_string());
        }
        entry.fields.merge(fields);
        debug!(table, %key, fields = fields.len(), "Entry modified");
        Ok(())
    }
}
