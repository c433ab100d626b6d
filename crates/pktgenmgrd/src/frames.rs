//! Template and expected frames for generator applications.

use pktgen_types::{build_frame, MacAddress};

use crate::error::{PktgenError, PktgenResult};
use crate::tables::FRAMING_HEADER_LEN;
use crate::types::{AppId, GeneratorConfig};

fn frame_len(config: &GeneratorConfig) -> PktgenResult<usize> {
    usize::try_from(config.packet_length_bytes())
        .map_err(|_| PktgenError::invalid_config("packet_length_bytes", "does not fit in memory"))
}

fn map_frame_error(err: pktgen_types::FrameError) -> PktgenError {
    PktgenError::invalid_config("packet_length_bytes", err.to_string())
}

/// Full template frame for an application: Ethernet/IPv4/UDP of the
/// configured length.
pub fn template_frame(config: &GeneratorConfig) -> PktgenResult<Vec<u8>> {
    build_frame(frame_len(config)?, None).map_err(map_frame_error)
}

/// Bytes written to the packet buffer: the template minus the leading bytes
/// the generator replaces with its own header.
pub fn buffer_payload(config: &GeneratorConfig) -> PktgenResult<Vec<u8>> {
    let mut frame = template_frame(config)?;
    frame.drain(..FRAMING_HEADER_LEN as usize);
    Ok(frame)
}

/// Number of frames one trigger of the application emits.
pub fn expected_frame_count(config: &GeneratorConfig) -> u64 {
    u64::from(config.batch_count()) * u64::from(config.packets_per_batch())
}

/// Frames a timer-triggered application is expected to emit for one
/// trigger, in order: batch-major, each addressed with its timer header.
///
/// Frames are produced lazily; a trigger may emit up to 2^32 of them.
pub fn expected_frames(
    config: &GeneratorConfig,
    pipe_id: u8,
    app_id: AppId,
) -> PktgenResult<impl Iterator<Item = Vec<u8>>> {
    let app = u8::try_from(app_id)
        .ok()
        .filter(|a| *a < 8)
        .ok_or_else(|| PktgenError::invalid_config("app_id", format!("{} does not fit the 3-bit header field", app_id)))?;
    let template = build_frame(frame_len(config)?, Some(MacAddress::BROADCAST)).map_err(map_frame_error)?;
    let packets_per_batch = config.packets_per_batch();

    // counts are bounded by 1 << 16, so the 0-based ids fit in u16
    let frames = (0..config.batch_count()).flat_map(move |batch| {
        let template = template.clone();
        (0..packets_per_batch).map(move |packet| {
            let dst = MacAddress::timer_header(pipe_id, app, batch as u16, packet as u16);
            let mut frame = template.clone();
            frame[..6].copy_from_slice(dst.as_bytes());
            frame
        })
    });
    Ok(frames)
}

/// One line per expected frame, at most `limit` of them: destination
/// address and length.
pub fn describe_expected_frames(
    config: &GeneratorConfig,
    pipe_id: u8,
    app_id: AppId,
    limit: usize,
) -> PktgenResult<Vec<String>> {
    let lines = expected_frames(config, pipe_id, app_id)?
        .take(limit)
        .map(|frame| {
            let dst: Vec<String> = frame[..6].iter().map(|b| format!("{:02x}", b)).collect();
            format!("{} {} bytes", dst.join(":"), frame.len())
        })
        .collect();
    Ok(lines)
}
