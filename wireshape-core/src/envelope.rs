//! Event-stream frame envelopes.
//!
//! Event streams exchange discriminated frames over one long-lived
//! connection. Each frame carries its event name inline so the receiver
//! can dispatch the payload without out-of-band state:
//!
//! ```text
//! [flags:1][name_len:2][event_name:name_len][payload_len:4][payload]
//! ```
//!
//! All integers are big-endian. This module provides the framing
//! primitives; buffered decoding and payload dispatch live in the
//! protocol crate.

use bytes::Bytes;

use crate::error::EnvelopeError;

/// Event frame flags.
pub mod event_flags {
    /// Regular event frame.
    pub const MESSAGE: u8 = 0x00;
    /// End of stream; carries no event name and no payload.
    pub const END_STREAM: u8 = 0x02;
}

/// Fixed prefix size: flags byte plus name length.
pub const EVENT_PRELUDE_SIZE: usize = 3;

/// Maximum event name length in bytes.
pub const MAX_EVENT_NAME_LEN: usize = 255;

/// A parsed event frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    pub flags: u8,
    pub name: String,
    pub payload: Bytes,
}

impl EventFrame {
    pub fn is_end_stream(&self) -> bool {
        self.flags == event_flags::END_STREAM
    }
}

/// Wrap an event payload in a frame envelope.
///
/// # Errors
/// Fails if the event name exceeds [`MAX_EVENT_NAME_LEN`].
pub fn wrap_event_frame(name: &str, payload: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    if name.len() > MAX_EVENT_NAME_LEN {
        return Err(EnvelopeError::NameTooLong {
            len: name.len(),
            max: MAX_EVENT_NAME_LEN,
        });
    }

    let mut frame = Vec::with_capacity(EVENT_PRELUDE_SIZE + name.len() + 4 + payload.len());
    frame.push(event_flags::MESSAGE);
    frame.extend_from_slice(&(name.len() as u16).to_be_bytes());
    frame.extend_from_slice(name.as_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// The frame that terminates a stream: end-stream flags, empty name,
/// empty payload.
pub fn end_stream_frame() -> Vec<u8> {
    let mut frame = Vec::with_capacity(EVENT_PRELUDE_SIZE + 4);
    frame.push(event_flags::END_STREAM);
    frame.extend_from_slice(&0u16.to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes());
    frame
}

/// Total length of the frame starting at the head of `data`.
///
/// Returns `Ok(None)` while too few bytes have arrived to know, so a
/// buffering decoder can poll for more input.
///
/// # Errors
/// Fails on an oversized name length; truncation is not an error here
/// (the caller decides when the input is exhausted).
pub fn required_frame_len(data: &[u8]) -> Result<Option<usize>, EnvelopeError> {
    if data.len() < EVENT_PRELUDE_SIZE {
        return Ok(None);
    }

    let name_len = u16::from_be_bytes([data[1], data[2]]) as usize;
    if name_len > MAX_EVENT_NAME_LEN {
        return Err(EnvelopeError::NameTooLong {
            len: name_len,
            max: MAX_EVENT_NAME_LEN,
        });
    }

    let payload_len_at = EVENT_PRELUDE_SIZE + name_len;
    if data.len() < payload_len_at + 4 {
        return Ok(None);
    }

    let payload_len = u32::from_be_bytes([
        data[payload_len_at],
        data[payload_len_at + 1],
        data[payload_len_at + 2],
        data[payload_len_at + 3],
    ]) as usize;

    Ok(Some(payload_len_at + 4 + payload_len))
}

/// Split one complete frame into its parts.
///
/// `frame` must be exactly the length reported by [`required_frame_len`].
///
/// # Errors
/// Fails on unknown flags, a non-UTF-8 event name, or a frame shorter
/// than its own header claims.
pub fn split_event_frame(frame: &[u8]) -> Result<EventFrame, EnvelopeError> {
    let expected = required_frame_len(frame)?.ok_or(EnvelopeError::Truncated {
        expected: EVENT_PRELUDE_SIZE,
        got: frame.len(),
    })?;
    if frame.len() < expected {
        return Err(EnvelopeError::Truncated {
            expected,
            got: frame.len(),
        });
    }

    let flags = frame[0];
    if flags != event_flags::MESSAGE && flags != event_flags::END_STREAM {
        return Err(EnvelopeError::InvalidFlags { flags });
    }

    let name_len = u16::from_be_bytes([frame[1], frame[2]]) as usize;
    let name = std::str::from_utf8(&frame[EVENT_PRELUDE_SIZE..EVENT_PRELUDE_SIZE + name_len])
        .map_err(|_| EnvelopeError::InvalidName)?
        .to_owned();

    let payload_at = EVENT_PRELUDE_SIZE + name_len + 4;
    let payload = Bytes::copy_from_slice(&frame[payload_at..expected]);

    Ok(EventFrame {
        flags,
        name,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_and_split_round_trip() {
        let frame = wrap_event_frame("Records", b"{\"a\":1}").unwrap();
        let parsed = split_event_frame(&frame).unwrap();

        assert_eq!(parsed.flags, event_flags::MESSAGE);
        assert_eq!(parsed.name, "Records");
        assert_eq!(&parsed.payload[..], b"{\"a\":1}");
        assert!(!parsed.is_end_stream());
    }

    #[test]
    fn test_end_stream_frame() {
        let frame = end_stream_frame();
        let parsed = split_event_frame(&frame).unwrap();

        assert!(parsed.is_end_stream());
        assert!(parsed.name.is_empty());
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_required_frame_len_incomplete() {
        let frame = wrap_event_frame("Stats", b"payload").unwrap();

        // Too short for the prelude.
        assert_eq!(required_frame_len(&frame[..2]).unwrap(), None);
        // Prelude present, payload length not yet.
        assert_eq!(required_frame_len(&frame[..6]).unwrap(), None);
        // Complete header.
        assert_eq!(required_frame_len(&frame).unwrap(), Some(frame.len()));
    }

    #[test]
    fn test_oversized_name_rejected() {
        let name = "x".repeat(MAX_EVENT_NAME_LEN + 1);
        let err = wrap_event_frame(&name, b"").unwrap_err();
        assert!(matches!(err, EnvelopeError::NameTooLong { .. }));
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let mut frame = wrap_event_frame("A", b"p").unwrap();
        frame[0] = 0x7f;
        let err = split_event_frame(&frame).unwrap_err();
        assert_eq!(err, EnvelopeError::InvalidFlags { flags: 0x7f });
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let frame = wrap_event_frame("A", b"payload").unwrap();
        let err = split_event_frame(&frame[..frame.len() - 2]).unwrap_err();
        assert!(matches!(err, EnvelopeError::Truncated { .. }));
    }
}
