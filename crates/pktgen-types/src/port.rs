//! Device port numbers and generator-capable port ranges.

use crate::ParseError;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// A device port number as addressed by the port configuration table.
pub type DevPort = u32;

/// Number of low bits of a device port that select the port within its pipe.
const PIPE_PORT_BITS: u32 = 7;

/// Returns the pipe a device port belongs to.
pub const fn port_to_pipe(port: DevPort) -> u32 {
    port >> PIPE_PORT_BITS
}

/// Contiguous inclusive range of ports able to host a packet generator.
///
/// Tofino exposes generator ports 68-71 in each pipe; Tofino2 exposes 0-7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub min: DevPort,
    pub max: DevPort,
}

impl PortRange {
    /// Generator ports of a first-generation Tofino pipe.
    pub const TOFINO: PortRange = PortRange { min: 68, max: 71 };

    /// Generator ports of a Tofino2 pipe.
    pub const TOFINO2: PortRange = PortRange { min: 0, max: 7 };

    pub fn new(min: DevPort, max: DevPort) -> Result<Self, ParseError> {
        if min > max {
            return Err(ParseError::InvalidPortRange(format!("{}-{}", min, max)));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, port: DevPort) -> bool {
        self.as_range().contains(&port)
    }

    pub fn as_range(&self) -> RangeInclusive<DevPort> {
        self.min..=self.max
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self::TOFINO
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl FromStr for PortRange {
    type Err = ParseError;

    /// Parses `"68-71"` style ranges.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| ParseError::InvalidPortRange(s.to_string()))?;
        let min = min
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidPortRange(s.to_string()))?;
        let max = max
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidPortRange(s.to_string()))?;
        PortRange::new(min, max)
    }
}
