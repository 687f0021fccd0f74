//! Inbound event frame decoding.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;
use wireshape_core::{Value, required_frame_len, split_event_frame};

use super::dispatch::EventStreamDispatcher;
use super::EventStreamError;

/// One successfully decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    pub value: Value,
}

/// Stream adapter that decodes event frames from a byte stream.
///
/// Wraps a transport byte stream and yields decoded events. Frames
/// naming an unregistered event yield a recoverable error item and the
/// stream continues; framing corruption and transport failures end the
/// stream. The decoder owns only its reassembly buffer, so dropping it
/// mid-stream leaks nothing.
pub struct EventFrameDecoder<S> {
    stream: S,
    dispatcher: Arc<EventStreamDispatcher>,
    buffer: BytesMut,
    max_frame_len: usize,
    finished: bool,
}

/// Default cap on a single frame, matching common transport limits.
const DEFAULT_MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

impl<S> EventFrameDecoder<S> {
    pub fn new(stream: S, dispatcher: Arc<EventStreamDispatcher>) -> Self {
        Self {
            stream,
            dispatcher,
            buffer: BytesMut::new(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            finished: false,
        }
    }

    /// Cap the size of a single frame. A frame whose header claims more
    /// ends the stream: the peer is misbehaving and skipping would still
    /// require buffering the oversized payload.
    pub fn with_max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max;
        self
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode the next complete frame in the buffer, if any.
    ///
    /// A fatal framing error is returned as `Err`; per-frame
    /// dispatch/unmarshalling failures come back as
    /// [`FrameOutcome::Item`] errors so the caller keeps polling.
    fn try_decode_frame(&mut self) -> Result<FrameOutcome, EventStreamError> {
        let Some(frame_len) = required_frame_len(&self.buffer)? else {
            return Ok(FrameOutcome::NeedMore);
        };
        if frame_len > self.max_frame_len {
            return Err(EventStreamError::FrameTooLarge {
                len: frame_len,
                max: self.max_frame_len,
            });
        }
        if self.buffer.len() < frame_len {
            return Ok(FrameOutcome::NeedMore);
        }

        let frame_bytes = self.buffer.split_to(frame_len);
        let frame = split_event_frame(&frame_bytes)?;

        if frame.is_end_stream() {
            return Ok(FrameOutcome::EndStream);
        }

        let unmarshaller = match self.dispatcher.unmarshaller_for(&frame.name) {
            Ok(unmarshaller) => unmarshaller,
            Err(err) => {
                tracing::warn!(event = %frame.name, "skipping frame for unknown event type");
                return Ok(FrameOutcome::Item(Err(err.into())));
            }
        };

        match unmarshaller.unmarshall(&frame.payload) {
            Ok(value) => Ok(FrameOutcome::Item(Ok(DecodedEvent {
                name: frame.name,
                value,
            }))),
            Err(source) => Ok(FrameOutcome::Item(Err(EventStreamError::Payload {
                name: frame.name,
                source,
            }))),
        }
    }
}

/// Result of one decode attempt against the buffer.
enum FrameOutcome {
    /// More bytes are needed before the next frame completes.
    NeedMore,
    /// The end-stream frame arrived.
    EndStream,
    /// A decoded event or a recoverable per-frame error.
    Item(Result<DecodedEvent, EventStreamError>),
}

impl<S> Unpin for EventFrameDecoder<S> where S: Unpin {}

impl<S, E> Stream for EventFrameDecoder<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: std::fmt::Display,
{
    type Item = Result<DecodedEvent, EventStreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            match this.try_decode_frame() {
                Ok(FrameOutcome::EndStream) => {
                    this.finished = true;
                    return Poll::Ready(None);
                }
                Ok(FrameOutcome::Item(item)) => {
                    return Poll::Ready(Some(item));
                }
                Ok(FrameOutcome::NeedMore) => {}
                // Framing corruption: fatal.
                Err(err) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(err)));
                }
            }

            match Pin::new(&mut this.stream).poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Err(err))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(EventStreamError::Transport(err.to_string()))));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    if !this.buffer.is_empty() {
                        return Poll::Ready(Some(Err(EventStreamError::TruncatedStream {
                            buffered: this.buffer.len(),
                        })));
                    }
                    return Poll::Ready(Some(Err(EventStreamError::MissingEndStream)));
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }
    }
}
