//! Event-stream tagged-union dispatch and frame adapters.
//!
//! An event stream is a bidirectional sequence of discriminated frames
//! over one long-lived connection. The pieces here:
//!
//! - [`EventStreamDispatcher`]: an immutable mapping from event name to
//!   payload shape, built once and validated at construction
//! - [`EventFrameEncoder`]: wraps a stream of outbound events and yields
//!   framed bytes, terminated by an end-stream frame
//! - [`EventFrameDecoder`]: wraps a byte stream, parses frames, and
//!   dispatches payload unmarshalling by event name
//!
//! A frame naming an unregistered event is a recoverable, per-frame
//! error: the decoder reports it and keeps going. Framing corruption is
//! fatal because the byte boundaries are lost.

mod decoder;
mod dispatch;
mod encoder;

pub use decoder::{DecodedEvent, EventFrameDecoder};
pub use dispatch::{
    EventMarshaller, EventStreamDispatcher, EventStreamDispatcherBuilder, EventUnmarshaller,
};
pub use encoder::{EventFrameEncoder, OutboundEvent};

use wireshape_core::{EnvelopeError, MarshallingError, UnknownEventTypeError, UnmarshallingError};

/// Errors surfaced by event-stream adapters.
#[derive(Debug, thiserror::Error)]
pub enum EventStreamError {
    /// A frame named an event with no registered mapping.
    #[error(transparent)]
    UnknownEvent(#[from] UnknownEventTypeError),

    /// A known event's payload failed to unmarshall.
    #[error("event `{name}` could not be unmarshalled: {source}")]
    Payload {
        name: String,
        #[source]
        source: UnmarshallingError,
    },

    /// An outbound event's payload failed to marshall.
    #[error("event `{name}` could not be marshalled: {source}")]
    Marshalling {
        name: String,
        #[source]
        source: MarshallingError,
    },

    /// Frame framing was corrupted.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// The underlying byte stream failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A frame header claimed more bytes than the decoder allows.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },

    /// The byte stream ended in the middle of a frame.
    #[error("stream ended with {buffered} bytes of an incomplete frame")]
    TruncatedStream { buffered: usize },

    /// The byte stream ended cleanly but without an end-stream frame.
    #[error("stream ended without an end-stream frame")]
    MissingEndStream,
}

impl EventStreamError {
    /// Whether the stream can continue past this error.
    ///
    /// Per-frame failures (unknown event name, bad payload) leave the
    /// frame boundaries intact, so the next frame is still reachable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EventStreamError::UnknownEvent(_)
                | EventStreamError::Payload { .. }
                | EventStreamError::Marshalling { .. }
        )
    }
}
