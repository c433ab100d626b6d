//! Common types for driving a switch ASIC packet generator.
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses, including the encoding
//!   the generator uses to stamp pipe/app/batch/packet ids into frames
//! - [`DevPort`] and [`PortRange`]: device port numbers and generator-capable ranges
//! - [`frame`]: synthetic frame builder for the packet buffer

pub mod frame;
mod mac;
mod port;

pub use frame::{build_frame, FrameError, ETHERNET_HEADER_LEN, MIN_UDP_FRAME_LEN};
pub use mac::MacAddress;
pub use port::{port_to_pipe, DevPort, PortRange};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid port range: {0}")]
    InvalidPortRange(String),
}
