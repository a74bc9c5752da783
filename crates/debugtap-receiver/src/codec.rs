//! Record codec for the shared segment.
//!
//! Layout: `[0..4)` little-endian producer pid, then the message bytes up to
//! and including a NUL terminator. Bytes after the terminator are stale.

use crate::error::{ReceiverError, Result};
use crate::message::DebugMessage;

/// Size of the shared segment in bytes.
pub const SEGMENT_SIZE: usize = 4096;

/// Size of the producer pid header.
pub const PID_LEN: usize = size_of::<u32>();

/// Longest text that fits in the segment with its terminator.
pub const MAX_TEXT_LEN: usize = SEGMENT_SIZE - PID_LEN - 1;

/// Decodes the record at the start of `segment`.
///
/// Never reads past `segment.len()` and never mutates the segment. Text is
/// decoded lossily because producers write ANSI bytes.
///
/// # Errors
/// Returns [`ReceiverError::MalformedRecord`] if the segment is shorter than
/// the pid header or has no terminator.
pub fn decode(segment: &[u8]) -> Result<DebugMessage> {
    let Some((header, body)) = segment.split_first_chunk::<PID_LEN>() else {
        return Err(ReceiverError::malformed(format!(
            "segment of {} bytes cannot hold a pid",
            segment.len()
        )));
    };
    let end = body.iter().position(|&b| b == 0).ok_or_else(|| {
        ReceiverError::malformed(format!(
            "no terminator within {} bytes",
            segment.len()
        ))
    })?;

    Ok(DebugMessage {
        pid: u32::from_le_bytes(*header),
        text: String::from_utf8_lossy(&body[..end]).into_owned(),
    })
}

/// Encodes a record into `segment`, returning the bytes written.
///
/// # Errors
/// Returns [`ReceiverError::MalformedRecord`] if the text contains a NUL or
/// does not fit in `segment`.
pub fn encode(pid: u32, text: &str, segment: &mut [u8]) -> Result<usize> {
    if text.as_bytes().contains(&0) {
        return Err(ReceiverError::malformed("text contains a NUL byte"));
    }
    let len = PID_LEN + text.len() + 1;
    if len > segment.len() {
        return Err(ReceiverError::malformed(format!(
            "record of {len} bytes exceeds segment of {} bytes",
            segment.len()
        )));
    }

    segment[..PID_LEN].copy_from_slice(&pid.to_le_bytes());
    segment[PID_LEN..len - 1].copy_from_slice(text.as_bytes());
    segment[len - 1] = 0;
    Ok(len)
}
