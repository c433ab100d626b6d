//! Generator trigger types.

use std::fmt;
use std::str::FromStr;

use pktgen_table::schema::trigger;

use crate::error::PktgenError;

/// Condition that starts a generator batch run.
///
/// Each variant selects the data type of the application table entry, so
/// the identifier must accompany every write and read of that entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Fire once, `timer_nanosec` after the application is enabled.
    OneShot,
    /// Fire every `timer_nanosec`.
    Periodic,
    PortDown,
    Recirculation,
    Deparser,
    Pfc,
}

impl TriggerKind {
    pub const ALL: [TriggerKind; 6] = [
        TriggerKind::OneShot,
        TriggerKind::Periodic,
        TriggerKind::PortDown,
        TriggerKind::Recirculation,
        TriggerKind::Deparser,
        TriggerKind::Pfc,
    ];

    /// Device-side data type identifier.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::OneShot => trigger::TIMER_ONE_SHOT,
            Self::Periodic => trigger::TIMER_PERIODIC,
            Self::PortDown => trigger::PORT_DOWN,
            Self::Recirculation => trigger::RECIRC_PATTERN,
            Self::Deparser => trigger::DPRSR,
            Self::Pfc => trigger::PFC,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneShot => "ONE_SHOT",
            Self::Periodic => "PERIODIC",
            Self::PortDown => "PORT_DOWN",
            Self::Recirculation => "RECIRCULATION",
            Self::Deparser => "DEPARSER",
            Self::Pfc => "PFC",
        }
    }

    /// Returns true if the trigger is driven by the generator timer.
    pub fn is_timer(&self) -> bool {
        matches!(self, Self::OneShot | Self::Periodic)
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = PktgenError;

    /// Accepts either the variant name (`ONE_SHOT`, `one-shot`) or the device
    /// identifier (`trigger_timer_one_shot`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        TriggerKind::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized || t.identifier().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PktgenError::UnsupportedTrigger(s.to_string()))
    }
}
