//! Synthetic frame builder for the generator packet buffer.
//!
//! Frames are either Ethernet/IPv4/UDP with a fixed synthetic address pair,
//! or bare Ethernet carrying a caller-supplied destination address (used to
//! describe the frames a timer application is expected to emit). Both are
//! zero padded to the requested length.

use std::net::Ipv4Addr;

use etherparse::{EtherType, Ethernet2Header, Ipv4Header, PacketBuilder, UdpHeader};
use thiserror::Error;

use crate::MacAddress;

/// Length of an Ethernet II header.
pub const ETHERNET_HEADER_LEN: usize = Ethernet2Header::LEN;

/// Smallest frame able to hold the Ethernet/IPv4/UDP headers.
pub const MIN_UDP_FRAME_LEN: usize = Ethernet2Header::LEN + Ipv4Header::MIN_LEN + UdpHeader::LEN;

/// Ethertype of the bare frames describing generator output.
const ETHERTYPE_LOOPBACK: EtherType = EtherType(0x9000);
const DEFAULT_TTL: u8 = 64;
const DEFAULT_UDP_PORT: u16 = 53;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame length {length} is shorter than the {minimum}-byte header stack")]
    TooShort { length: usize, minimum: usize },

    #[error("frame length {0} does not fit the IPv4 total length field")]
    TooLong(usize),

    #[error("failed to serialize frame: {0}")]
    Build(String),
}

/// Builds a synthetic frame of exactly `length` bytes.
///
/// Without a destination the frame is `AA:AA:AA:AA:AA:AA -> broadcast`
/// IPv4/UDP between loopback addresses. With a destination it is an
/// Ethernet-only frame addressed to `dst`.
pub fn build_frame(length: usize, dst: Option<MacAddress>) -> Result<Vec<u8>, FrameError> {
    match dst {
        Some(dst) => build_ethernet_frame(length, dst),
        None => build_udp_frame(length),
    }
}

fn build_ethernet_frame(length: usize, dst: MacAddress) -> Result<Vec<u8>, FrameError> {
    if length < ETHERNET_HEADER_LEN {
        return Err(FrameError::TooShort {
            length,
            minimum: ETHERNET_HEADER_LEN,
        });
    }

    let header = Ethernet2Header {
        source: *MacAddress::SYNTHETIC_SOURCE.as_bytes(),
        destination: *dst.as_bytes(),
        ether_type: ETHERTYPE_LOOPBACK,
    };
    let mut frame = Vec::with_capacity(length);
    frame.extend_from_slice(&header.to_bytes());
    frame.resize(length, 0);
    Ok(frame)
}

fn build_udp_frame(length: usize) -> Result<Vec<u8>, FrameError> {
    let builder = PacketBuilder::ethernet2(
        *MacAddress::SYNTHETIC_SOURCE.as_bytes(),
        *MacAddress::BROADCAST.as_bytes(),
    )
    .ipv4(
        Ipv4Addr::LOCALHOST.octets(),
        Ipv4Addr::LOCALHOST.octets(),
        DEFAULT_TTL,
    )
    .udp(DEFAULT_UDP_PORT, DEFAULT_UDP_PORT);

    let header_len = builder.size(0);
    if length < header_len {
        return Err(FrameError::TooShort {
            length,
            minimum: header_len,
        });
    }
    if length - ETHERNET_HEADER_LEN > usize::from(u16::MAX) {
        return Err(FrameError::TooLong(length));
    }

    let payload = vec![0u8; length - header_len];
    let mut frame = Vec::<u8>::with_capacity(length);
    builder
        .write(&mut frame, &payload)
        .map_err(|e| FrameError::Build(e.to_string()))?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::{Ipv4HeaderSlice, UdpHeaderSlice};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_udp_frame_layout() {
        let frame = build_frame(100, None).unwrap();
        assert_eq!(frame.len(), 100);
        assert_eq!(&frame[0..6], &[0xff; 6]);
        assert_eq!(&frame[6..12], &[0xaa; 6]);
        assert_eq!(&frame[12..14], &[0x08, 0x00]);

        let ip = Ipv4HeaderSlice::from_slice(&frame[ETHERNET_HEADER_LEN..])
            .unwrap()
            .to_header();
        // IPv4 total length covers everything after the Ethernet header
        assert_eq!(ip.total_len, 86);
        assert_eq!(ip.time_to_live, DEFAULT_TTL);
        assert_eq!(ip.source, [127, 0, 0, 1]);
        assert_eq!(ip.destination, [127, 0, 0, 1]);
        assert_eq!(ip.header_checksum, ip.calc_header_checksum());

        let udp = UdpHeaderSlice::from_slice(&frame[ETHERNET_HEADER_LEN + Ipv4Header::MIN_LEN..])
            .unwrap();
        assert_eq!(udp.source_port(), 53);
        assert_eq!(udp.destination_port(), 53);
        assert_eq!(udp.length(), 66);
        assert!(frame[MIN_UDP_FRAME_LEN..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_minimum_udp_frame() {
        let frame = build_frame(MIN_UDP_FRAME_LEN, None).unwrap();
        assert_eq!(frame.len(), 42);
    }

    #[test]
    fn test_ethernet_frame_with_destination() {
        let dst = MacAddress::timer_header(0, 1, 0, 3);
        let frame = build_frame(60, Some(dst)).unwrap();
        assert_eq!(frame.len(), 60);
        assert_eq!(&frame[0..6], dst.as_bytes());
        assert_eq!(&frame[6..12], &[0xaa; 6]);
        assert_eq!(&frame[12..14], &[0x90, 0x00]);
        assert!(frame[ETHERNET_HEADER_LEN..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            build_frame(20, None),
            Err(FrameError::TooShort {
                length: 20,
                minimum: MIN_UDP_FRAME_LEN
            })
        );
        assert!(build_frame(10, Some(MacAddress::BROADCAST)).is_err());
        assert!(build_frame(ETHERNET_HEADER_LEN, Some(MacAddress::BROADCAST)).is_ok());
    }

    #[test]
    fn test_too_long() {
        assert_eq!(build_frame(70_000, None), Err(FrameError::TooLong(70_000)));
    }
}
