//! MAC address type used for synthetic frames and generator timer headers.

use std::fmt;

/// Bits the pipe id is shifted by in the first octet of a timer header.
const PIPE_SHIFT: u8 = 3;

/// A 48-bit Ethernet MAC address.
///
/// # Examples
///
/// ```
/// use pktgen_types::MacAddress;
///
/// let header = MacAddress::timer_header(1, 2, 0x0102, 0x0304);
/// assert_eq!(header.to_string(), "0a:00:01:02:03:04");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The broadcast MAC address (FF:FF:FF:FF:FF:FF).
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    /// Source address stamped on synthetic template frames.
    pub const SYNTHETIC_SOURCE: MacAddress = MacAddress([0xaa; 6]);

    /// Encodes the 6-byte generator timer header as a MAC address.
    ///
    /// The generator overwrites the first six bytes of every frame with
    /// `(pipe << 3 | app), 0, batch_hi, batch_lo, packet_hi, packet_lo`, so a
    /// generated frame carries this value in its destination address.
    pub const fn timer_header(pipe_id: u8, app_id: u8, batch_id: u16, packet_id: u16) -> Self {
        MacAddress([
            (pipe_id << PIPE_SHIFT) | app_id,
            0,
            (batch_id >> 8) as u8,
            (batch_id & 0xff) as u8,
            (packet_id >> 8) as u8,
            (packet_id & 0xff) as u8,
        ])
    }

    /// Returns the raw bytes of the MAC address.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}
